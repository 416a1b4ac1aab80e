use std::time::Duration;

/// Configuration knobs for [`probe_mailbox`](crate::probe::probe_mailbox).
///
/// Built once at startup and held immutably; defaults follow the baseline
/// design (first preferred host only, 10 second network bound, port 25).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    /// Identity announced in EHLO/HELO. Falls back to the target's ASCII
    /// domain when empty.
    pub helo_name: String,
    /// Envelope sender for `MAIL FROM`. Falls back to
    /// `postmaster@<target-domain>` when empty.
    pub mail_from: String,
    /// Connect/read/write deadline for the SMTP session. Always enforced.
    pub timeout: Duration,
    /// Deadline for the MX query.
    pub dns_timeout: Duration,
    /// How many MX hosts may be tried, in priority order. 1 keeps the
    /// baseline first-host-only behaviour.
    pub max_servers: usize,
    pub require_starttls: bool,
    pub ipv6: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_name: "localhost".to_string(),
            mail_from: String::new(),
            timeout: Duration::from_secs(10),
            dns_timeout: Duration::from_secs(5),
            max_servers: 1,
            require_starttls: false,
            ipv6: false,
        }
    }
}

impl ProbeOptions {
    pub fn helo_identity<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.helo_name.trim().is_empty() {
            fallback
        } else {
            self.helo_name.as_str()
        }
    }

    pub fn envelope_sender(&self, ascii_domain: &str) -> String {
        if self.mail_from.is_empty() {
            format!("postmaster@{ascii_domain}")
        } else {
            self.mail_from.clone()
        }
    }
}
