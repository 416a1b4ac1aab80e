//! Verdicts and the user-visible response shape they map to.

use std::fmt;

use crate::probe::SmtpReply;

/// Outcome of one verification request. Exactly one variant per request.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    MailboxExists,
    MailboxDoesNotExist,
    NoMxRecords,
    ConnectionError(String),
    InvalidInput(String),
}

impl ProbeResult {
    /// Classify the final `RCPT TO` reply.
    ///
    /// 2xx confirms the mailbox, 5xx confirms its absence. 4xx replies
    /// (greylisting, temporary policy) are inconclusive and surface as a
    /// connection-class failure, not as a negative verdict.
    pub fn from_rcpt_reply(reply: &SmtpReply) -> Self {
        if reply.is_positive_completion() {
            Self::MailboxExists
        } else if reply.is_permanent_failure() {
            Self::MailboxDoesNotExist
        } else if reply.is_transient_failure() {
            Self::ConnectionError(format!(
                "transient failure {}: {}",
                reply.code,
                reply.text()
            ))
        } else {
            Self::ConnectionError(format!("unexpected RCPT reply {}", reply.code))
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::MailboxExists)
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Error,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// The `{status, message}` pair handed back to callers.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: ResponseStatus,
    pub message: String,
}

impl Response {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl From<ProbeResult> for Response {
    fn from(result: ProbeResult) -> Self {
        match result {
            ProbeResult::MailboxExists => Self::success("Mailbox exists"),
            ProbeResult::MailboxDoesNotExist => Self::error("Mailbox does not exist"),
            ProbeResult::NoMxRecords => Self::error("No MX records found"),
            ProbeResult::ConnectionError(detail) | ProbeResult::InvalidInput(detail) => {
                Self::error(detail)
            }
        }
    }
}
