use thiserror::Error;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Strict,
    Relaxed,
}

/// A parsed mailbox address. Only built by
/// [`parse_email`](crate::validator::parse_email), so holding one implies the
/// input passed validation.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub original: String,
    pub local: String,
    pub domain: String,
    pub ascii_domain: String,
}

impl EmailAddress {
    /// `local@ascii_domain`, the form used on the wire in `RCPT TO`.
    pub fn ascii_mailbox(&self) -> String {
        format!("{}@{}", self.local, self.ascii_domain)
    }
}

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("invalid email address: {}", .reasons.join("; "))]
    Invalid { reasons: Vec<String> },
}

impl EmailError {
    pub fn reasons(&self) -> &[String] {
        match self {
            Self::Invalid { reasons } => reasons,
        }
    }
}
