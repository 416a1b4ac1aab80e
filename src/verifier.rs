//! The composed verification flow: parse → resolve → probe → classify.

use crate::mx::{self, MxRecord, MxStatus};
use crate::probe::{self, ProbeError, ProbeOptions, SmtpReply};
use crate::report::ProbeResult;
use crate::validator::{EmailAddress, ValidationMode, parse_email};

/// Stateless verification service.
///
/// Holds only immutable configuration, so a single instance constructed at
/// startup can serve any number of concurrent callers. Each call performs
/// one DNS query and at most `max_servers` SMTP sessions; nothing is shared
/// between calls.
#[derive(Debug, Clone)]
pub struct Verifier {
    mode: ValidationMode,
    options: ProbeOptions,
}

impl Verifier {
    pub fn new(options: ProbeOptions) -> Self {
        Self::with_mode(ValidationMode::Strict, options)
    }

    pub fn with_mode(mode: ValidationMode, options: ProbeOptions) -> Self {
        Self { mode, options }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Run the whole flow for one candidate address.
    ///
    /// Every failure comes back as a [`ProbeResult`] variant; no error
    /// escapes. Malformed input never reaches DNS, and a domain without MX
    /// records never opens a connection.
    pub fn verify(&self, email: &str) -> ProbeResult {
        self.run(
            email,
            |domain| mx::check_mx_with_timeout(domain, self.options.dns_timeout),
            |records, address| probe::probe_mailbox(records, address, &self.options),
        )
    }

    fn run<R, P>(&self, email: &str, resolve: R, probe: P) -> ProbeResult
    where
        R: FnOnce(&str) -> Result<MxStatus, mx::Error>,
        P: FnOnce(&[MxRecord], &EmailAddress) -> Result<SmtpReply, ProbeError>,
    {
        let address = match parse_email(email, self.mode) {
            Ok(address) => address,
            Err(err) => return ProbeResult::InvalidInput(err.to_string()),
        };

        let status = match resolve(&address.ascii_domain) {
            Ok(status) => status,
            Err(err) => return ProbeResult::ConnectionError(err.to_string()),
        };

        let records = match status {
            MxStatus::NoRecords => return ProbeResult::NoMxRecords,
            MxStatus::Records(records) => records,
        };

        match probe(&records, &address) {
            Ok(reply) => ProbeResult::from_rcpt_reply(&reply),
            Err(err) => ProbeResult::ConnectionError(err.to_string()),
        }
    }
}
