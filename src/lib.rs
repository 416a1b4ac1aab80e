#![forbid(unsafe_code)]
//! mailprobe_lib — mailbox existence probing (MX + SMTP RCPT TO)

pub mod validator;
pub use validator::{EmailAddress, EmailError, ValidationMode, parse_email};

pub mod mx;
pub use mx::{Error as MxError, MxRecord, MxStatus, check_mx, check_mx_with_timeout};

pub mod probe;
pub use probe::{ProbeError, ProbeOptions, SmtpReply, probe_mailbox};

pub mod report;
pub use report::{ProbeResult, Response, ResponseStatus};

mod verifier;
pub use verifier::Verifier;
