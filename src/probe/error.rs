use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no SMTP servers available")]
    NoServers,
    #[error("no socket addresses resolved for {host}")]
    NoAddresses { host: String },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("timed out waiting for the server: {source}")]
    Timeout {
        #[source]
        source: io::Error,
    },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: io::Error,
    },
    #[error("TLS handshake failed: {source}")]
    Tls {
        #[source]
        source: native_tls::Error,
    },
    #[error("SMTP protocol error: {0}")]
    Protocol(String),
    #[error("STARTTLS required but not available on {host}")]
    StartTlsUnavailable { host: String },
}

impl ProbeError {
    /// Read/write failures caused by the socket deadline surface as
    /// [`ProbeError::Timeout`] so the detail text names the timeout.
    pub(crate) fn io(source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Timeout { source },
            _ => Self::Io { source },
        }
    }

    pub(crate) fn connect(host: &str, source: io::Error) -> Self {
        Self::Connect {
            host: host.to_string(),
            source,
        }
    }
}
