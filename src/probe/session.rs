use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use native_tls::{HandshakeError, TlsConnector, TlsStream};

use super::error::ProbeError;

/// A parsed SMTP reply: the status code plus the text of each line.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    pub fn has_capability(&self, cap: &str) -> bool {
        self.lines.iter().any(|line| {
            line.split_whitespace()
                .next()
                .map(|token| token.eq_ignore_ascii_case(cap))
                .unwrap_or(false)
        })
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug)]
enum StreamState {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Invalid,
}

/// Buffered SMTP transport that can be upgraded to TLS in place.
#[derive(Debug)]
struct SmtpStream {
    state: StreamState,
    buffer: Vec<u8>,
}

impl SmtpStream {
    fn connect(addr: &SocketAddr, timeout: Duration) -> Result<Self, io::Error> {
        let stream = TcpStream::connect_timeout(addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(Self {
            state: StreamState::Plain(stream),
            buffer: Vec::new(),
        })
    }

    fn upgrade_tls(
        &mut self,
        domain: &str,
        connector: &TlsConnector,
        timeout: Duration,
    ) -> Result<(), ProbeError> {
        let mut state = StreamState::Invalid;
        std::mem::swap(&mut self.state, &mut state);
        let plain = match state {
            StreamState::Plain(stream) => stream,
            StreamState::Tls(stream) => {
                self.state = StreamState::Tls(stream);
                return Ok(());
            }
            StreamState::Invalid => {
                return Err(ProbeError::Protocol("invalid stream state".into()));
            }
        };

        let mut tls = complete_handshake(connector, domain, plain)?;
        tls.get_mut()
            .set_read_timeout(Some(timeout))
            .map_err(ProbeError::io)?;
        tls.get_mut()
            .set_write_timeout(Some(timeout))
            .map_err(ProbeError::io)?;
        self.state = StreamState::Tls(Box::new(tls));
        Ok(())
    }

    fn send_command(&mut self, command: &str) -> Result<(), ProbeError> {
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        match &mut self.state {
            StreamState::Plain(stream) => {
                stream.write_all(&data).map_err(ProbeError::io)?;
                stream.flush().map_err(ProbeError::io)?;
            }
            StreamState::Tls(stream) => {
                stream.write_all(&data).map_err(ProbeError::io)?;
                stream.flush().map_err(ProbeError::io)?;
            }
            StreamState::Invalid => {
                return Err(ProbeError::Protocol("invalid stream state".into()));
            }
        }
        Ok(())
    }

    fn read_reply(&mut self) -> Result<SmtpReply, ProbeError> {
        let mut lines = Vec::new();
        let mut code: Option<u16> = None;
        loop {
            let line = self.read_line()?;
            if line.len() < 3 {
                return Err(ProbeError::Protocol(format!("invalid reply: {line}")));
            }
            let parsed_code = line[..3]
                .parse::<u16>()
                .map_err(|_| ProbeError::Protocol(format!("invalid code in line: {line}")))?;
            if let Some(existing) = code {
                if existing != parsed_code {
                    return Err(ProbeError::Protocol(format!(
                        "inconsistent reply codes: {existing} vs {parsed_code}"
                    )));
                }
            } else {
                code = Some(parsed_code);
            }
            let is_last = !line.as_bytes().get(3).map(|b| *b == b'-').unwrap_or(false);
            let text = if line.len() > 4 {
                line[4..].to_string()
            } else {
                String::new()
            };
            lines.push(text);
            if is_last {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.unwrap_or(0),
            lines,
        })
    }

    fn read_line(&mut self) -> Result<String, ProbeError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                if line.ends_with(b"\r\n") {
                    line.truncate(line.len() - 2);
                } else if line.ends_with(b"\n") {
                    line.truncate(line.len() - 1);
                }
                return String::from_utf8(line)
                    .map_err(|err| ProbeError::Protocol(format!("utf8 error: {err}")));
            }

            let mut buf = [0u8; 512];
            let read = match &mut self.state {
                StreamState::Plain(stream) => stream.read(&mut buf),
                StreamState::Tls(stream) => stream.read(&mut buf),
                StreamState::Invalid => {
                    return Err(ProbeError::Protocol("invalid stream state".into()));
                }
            };
            let read = read.map_err(ProbeError::io)?;
            if read == 0 {
                return Err(ProbeError::Io {
                    source: io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"),
                });
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }
}

fn complete_handshake(
    connector: &TlsConnector,
    domain: &str,
    stream: TcpStream,
) -> Result<TlsStream<TcpStream>, ProbeError> {
    match connector.connect(domain, stream) {
        Ok(tls) => Ok(tls),
        Err(HandshakeError::Failure(err)) => Err(ProbeError::Tls { source: err }),
        Err(HandshakeError::WouldBlock(mut mid)) => loop {
            match mid.handshake() {
                Ok(tls) => break Ok(tls),
                Err(HandshakeError::Failure(err)) => {
                    break Err(ProbeError::Tls { source: err });
                }
                Err(HandshakeError::WouldBlock(next)) => mid = next,
            }
        },
    }
}

/// One SMTP conversation with a single host.
pub(crate) struct SmtpSession {
    host: String,
    stream: SmtpStream,
}

impl SmtpSession {
    /// Connect to the first reachable address of `host`.
    pub(crate) fn connect(
        host: &str,
        addresses: &[SocketAddr],
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let mut last_err = None;
        for addr in addresses {
            match SmtpStream::connect(addr, timeout) {
                Ok(stream) => {
                    return Ok(Self {
                        host: host.to_string(),
                        stream,
                    });
                }
                Err(err) => last_err = Some(ProbeError::connect(host, err)),
            }
        }
        Err(last_err.unwrap_or_else(|| ProbeError::NoAddresses {
            host: host.to_string(),
        }))
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn read_greeting(&mut self) -> Result<SmtpReply, ProbeError> {
        let reply = self.stream.read_reply()?;
        #[cfg(feature = "with-tracing")]
        tracing::trace!(host = %self.host, code = reply.code, "greeting");
        Ok(reply)
    }

    /// Send one command and consume its reply before returning. The strict
    /// request-response pairing is what keeps the session state predictable.
    pub(crate) fn command(&mut self, command: &str) -> Result<SmtpReply, ProbeError> {
        #[cfg(feature = "with-tracing")]
        tracing::trace!(host = %self.host, command, "send");
        self.stream.send_command(command)?;
        let reply = self.stream.read_reply()?;
        #[cfg(feature = "with-tracing")]
        tracing::trace!(host = %self.host, code = reply.code, "reply");
        Ok(reply)
    }

    pub(crate) fn starttls(
        &mut self,
        connector: &TlsConnector,
        timeout: Duration,
    ) -> Result<SmtpReply, ProbeError> {
        let reply = self.command("STARTTLS")?;
        if !reply.is_positive_completion() {
            return Ok(reply);
        }
        let host = self.host.clone();
        self.stream.upgrade_tls(&host, connector, timeout)?;
        Ok(reply)
    }

    /// Close the session. The server's farewell is read but cannot change
    /// the verdict at this point.
    pub(crate) fn quit(&mut self) -> Result<(), ProbeError> {
        self.stream.send_command("QUIT")?;
        let _ = self.stream.read_reply();
        Ok(())
    }
}
