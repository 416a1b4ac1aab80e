//! Mailbox address parsing and validation.
//!
//! [`parse_email`] is the gate in front of the resolver and the prober:
//! malformed input is rejected here, before any DNS or network activity.

mod domain;
mod local;
mod types;

pub use types::{EmailAddress, EmailError, ValidationMode};

use domain::{check_domain, normalize_domain};
use local::{is_local_relaxed, is_local_strict};

/// Parse and validate `input` as a mailbox address.
///
/// All failure reasons are accumulated into a single [`EmailError::Invalid`].
pub fn parse_email(input: &str, mode: ValidationMode) -> Result<EmailAddress, EmailError> {
    let trimmed = input.trim();
    let mut reasons = Vec::new();

    if trimmed.len() > 254 {
        reasons.push(format!("total length {} > 254", trimmed.len()));
    }

    let parts: Vec<&str> = trimmed.split('@').collect();
    if parts.len() != 2 {
        reasons.push("must contain exactly one '@'".to_string());
        return Err(EmailError::Invalid { reasons });
    }
    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() || local.len() > 64 {
        reasons.push(format!("local part length {} invalid (1..=64)", local.len()));
    }

    let local_ok = match mode {
        ValidationMode::Strict => is_local_strict(local),
        ValidationMode::Relaxed => is_local_relaxed(local),
    };
    if !local_ok {
        reasons.push(match mode {
            ValidationMode::Strict => "invalid local part (strict rules)".into(),
            ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }

    check_domain(domain, &mut reasons);

    if !reasons.is_empty() {
        return Err(EmailError::Invalid { reasons });
    }

    let (domain_lower, ascii_domain) = normalize_domain(domain);
    Ok(EmailAddress {
        original: input.to_string(),
        local: local.to_string(),
        domain: domain_lower,
        ascii_domain,
    })
}
