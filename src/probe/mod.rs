//! SMTP mailbox probing.
//!
//! [`probe_mailbox`] walks the resolved MX hosts in priority order and
//! returns the final `RCPT TO` reply of the first host that completes a
//! session. Connection-class failures fall through to the next host (when
//! the options allow more than one); a completed SMTP reply ends the probe
//! whatever its code. Every session is closed with `QUIT`, on success and
//! failure paths alike.

mod error;
mod options;
mod session;

pub use error::ProbeError;
pub use options::ProbeOptions;
pub use session::SmtpReply;

use std::net::{SocketAddr, ToSocketAddrs};

use native_tls::TlsConnector;

use crate::mx::MxRecord;
use crate::validator::EmailAddress;
use session::SmtpSession;

/// Probe `email` against `records`, already sorted by priority.
pub fn probe_mailbox(
    records: &[MxRecord],
    email: &EmailAddress,
    options: &ProbeOptions,
) -> Result<SmtpReply, ProbeError> {
    probe_hosts_with(records, options, |host| probe_host(host, email, options))
}

/// Host-iteration skeleton: at most `max_servers` hosts, each tried exactly
/// once, keeping the order of `records`.
pub(crate) fn probe_hosts_with<F>(
    records: &[MxRecord],
    options: &ProbeOptions,
    mut per_host: F,
) -> Result<SmtpReply, ProbeError>
where
    F: FnMut(&str) -> Result<SmtpReply, ProbeError>,
{
    let mut last_err = None;
    for record in records.iter().take(options.max_servers.max(1)) {
        match per_host(&record.host) {
            Ok(reply) => return Ok(reply),
            Err(err) => {
                #[cfg(feature = "with-tracing")]
                tracing::debug!(host = %record.host, error = %err, "probe attempt failed");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or(ProbeError::NoServers))
}

fn probe_host(
    host: &str,
    email: &EmailAddress,
    options: &ProbeOptions,
) -> Result<SmtpReply, ProbeError> {
    let addresses = resolve_addrs(host, options.port, options.ipv6)?;
    if addresses.is_empty() {
        return Err(ProbeError::NoAddresses {
            host: host.to_string(),
        });
    }

    let mut session = SmtpSession::connect(host, &addresses, options.timeout)?;
    let outcome = run_handshake(&mut session, email, options);
    // QUIT on every exit path; the socket drops with the session.
    session.quit().ok();
    outcome
}

fn run_handshake(
    session: &mut SmtpSession,
    email: &EmailAddress,
    options: &ProbeOptions,
) -> Result<SmtpReply, ProbeError> {
    let greeting = session.read_greeting()?;
    if !greeting.is_positive_completion() {
        return Err(ProbeError::Protocol(format!(
            "unexpected greeting {}",
            greeting.code
        )));
    }

    let identity = options.helo_identity(&email.ascii_domain).to_string();
    let ehlo_cmd = format!("EHLO {identity}");
    let ehlo = session.command(&ehlo_cmd)?;

    if ehlo.is_positive_completion() {
        if ehlo.has_capability("STARTTLS") {
            let connector = TlsConnector::new().map_err(|source| ProbeError::Tls { source })?;
            let tls_reply = session.starttls(&connector, options.timeout)?;
            if tls_reply.is_positive_completion() {
                // capabilities must be re-read over the encrypted channel
                let repeat = session.command(&ehlo_cmd)?;
                if !repeat.is_positive_completion() {
                    return Err(ProbeError::Protocol(format!(
                        "EHLO after STARTTLS rejected with {}",
                        repeat.code
                    )));
                }
            } else if options.require_starttls {
                return Err(ProbeError::StartTlsUnavailable {
                    host: session.host().to_string(),
                });
            }
        } else if options.require_starttls {
            return Err(ProbeError::StartTlsUnavailable {
                host: session.host().to_string(),
            });
        }
    } else {
        // pre-ESMTP server: retry with HELO
        if options.require_starttls {
            return Err(ProbeError::StartTlsUnavailable {
                host: session.host().to_string(),
            });
        }
        let helo = session.command(&format!("HELO {identity}"))?;
        if !helo.is_positive_completion() {
            return Err(ProbeError::Protocol(format!(
                "HELO rejected with {}",
                helo.code
            )));
        }
    }

    let sender = options.envelope_sender(&email.ascii_domain);
    let mail_reply = session.command(&format!("MAIL FROM:<{sender}>"))?;
    if !mail_reply.is_positive_completion() {
        return Err(ProbeError::Protocol(format!(
            "MAIL FROM rejected with {}",
            mail_reply.code
        )));
    }

    // The RCPT TO reply is the verdict material, whatever its code.
    session.command(&format!("RCPT TO:<{}>", email.ascii_mailbox()))
}

fn resolve_addrs(host: &str, port: u16, allow_ipv6: bool) -> Result<Vec<SocketAddr>, ProbeError> {
    let query = format!("{host}:{port}");
    let iter = query.to_socket_addrs().map_err(ProbeError::io)?;
    Ok(iter
        .filter(|addr| allow_ipv6 || !addr.is_ipv6())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{ValidationMode, parse_email};
    use std::io::{self, BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn target() -> EmailAddress {
        parse_email("user@example.com", ValidationMode::Strict).expect("valid address")
    }

    fn reply(code: u16) -> SmtpReply {
        SmtpReply {
            code,
            lines: vec![String::new()],
        }
    }

    fn refused(host: &str) -> ProbeError {
        ProbeError::connect(
            host,
            io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        )
    }

    #[test]
    fn tries_hosts_in_priority_order() {
        let records = vec![
            MxRecord::new(10, "mx1.example.com"),
            MxRecord::new(20, "mx2.example.com"),
        ];
        let options = ProbeOptions {
            max_servers: 2,
            ..ProbeOptions::default()
        };

        let mut tried = Vec::new();
        let result = probe_hosts_with(&records, &options, |host| {
            tried.push(host.to_string());
            if host == "mx1.example.com" {
                Err(refused(host))
            } else {
                Ok(reply(250))
            }
        });

        assert_eq!(tried, vec!["mx1.example.com", "mx2.example.com"]);
        assert_eq!(result.expect("second host answers").code, 250);
    }

    #[test]
    fn completed_reply_ends_the_probe() {
        let records = vec![
            MxRecord::new(10, "mx1.example.com"),
            MxRecord::new(20, "mx2.example.com"),
        ];
        let options = ProbeOptions {
            max_servers: 2,
            ..ProbeOptions::default()
        };

        let mut tried = Vec::new();
        let result = probe_hosts_with(&records, &options, |host| {
            tried.push(host.to_string());
            // a completed rejection is a verdict, not a reason to fall back
            Ok(reply(550))
        });

        assert_eq!(tried, vec!["mx1.example.com"]);
        assert_eq!(result.expect("completed reply").code, 550);
    }

    #[test]
    fn baseline_tries_only_the_preferred_host() {
        let records = vec![
            MxRecord::new(10, "mx1.example.com"),
            MxRecord::new(20, "mx2.example.com"),
        ];
        let options = ProbeOptions::default();

        let mut tried = Vec::new();
        let result = probe_hosts_with(&records, &options, |host| {
            tried.push(host.to_string());
            Err(refused(host))
        });

        assert_eq!(tried, vec!["mx1.example.com"]);
        assert!(matches!(result, Err(ProbeError::Connect { .. })));
    }

    #[test]
    fn no_hosts_is_an_error() {
        let result = probe_hosts_with(&[], &ProbeOptions::default(), |_| Ok(reply(250)));
        assert!(matches!(result, Err(ProbeError::NoServers)));
    }

    fn spawn_mock_server(
        banner: &'static str,
        script: Vec<(&'static str, &'static str)>,
    ) -> (u16, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("addr").port();
        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            ready_tx.send(()).ok();
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = handle_session(&mut stream, banner, script);
            }
        });
        ready_rx.recv().expect("server ready");
        (port, handle)
    }

    fn handle_session(
        stream: &mut TcpStream,
        banner: &'static str,
        script: Vec<(&'static str, &'static str)>,
    ) -> io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        stream.write_all(banner.as_bytes())?;
        stream.flush()?;
        for (expected, response) in script {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            assert!(
                line.starts_with(expected),
                "expected command starting with '{expected}', got '{line}'"
            );
            stream.write_all(response.as_bytes())?;
            stream.flush()?;
        }
        Ok(())
    }

    fn loopback_options(port: u16) -> ProbeOptions {
        ProbeOptions {
            port,
            timeout: Duration::from_secs(5),
            ..ProbeOptions::default()
        }
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn rcpt_accepted_returns_250() {
        let (port, handle) = spawn_mock_server(
            "220 mock.smtp.test ESMTP\r\n",
            vec![
                ("EHLO", "250-mock.example\r\n250 SIZE 35882577\r\n"),
                ("MAIL FROM:<postmaster@example.com>", "250 2.1.0 Ok\r\n"),
                ("RCPT TO:<user@example.com>", "250 2.1.5 Ok\r\n"),
                ("QUIT", "221 2.0.0 Bye\r\n"),
            ],
        );
        let records = vec![MxRecord::new(10, "127.0.0.1")];
        let reply = probe_mailbox(&records, &target(), &loopback_options(port))
            .expect("session completes");
        assert_eq!(reply.code, 250);
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn rcpt_rejected_returns_550() {
        let (port, handle) = spawn_mock_server(
            "220 mock.smtp.test ESMTP\r\n",
            vec![
                ("EHLO", "250 mock.example\r\n"),
                ("MAIL FROM:", "250 2.1.0 Ok\r\n"),
                ("RCPT TO:", "550 5.1.1 User unknown\r\n"),
                ("QUIT", "221 2.0.0 Bye\r\n"),
            ],
        );
        let records = vec![MxRecord::new(10, "127.0.0.1")];
        let reply = probe_mailbox(&records, &target(), &loopback_options(port))
            .expect("session completes");
        assert_eq!(reply.code, 550);
        assert!(reply.is_permanent_failure());
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn helo_fallback_when_ehlo_rejected() {
        let (port, handle) = spawn_mock_server(
            "220 mock.smtp.test\r\n",
            vec![
                ("EHLO", "502 5.5.1 command not implemented\r\n"),
                ("HELO", "250 mock.example\r\n"),
                ("MAIL FROM:", "250 Ok\r\n"),
                ("RCPT TO:", "250 Ok\r\n"),
                ("QUIT", "221 Bye\r\n"),
            ],
        );
        let records = vec![MxRecord::new(10, "127.0.0.1")];
        let reply = probe_mailbox(&records, &target(), &loopback_options(port))
            .expect("session completes");
        assert_eq!(reply.code, 250);
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn quit_is_sent_even_after_rejected_greeting() {
        // the script only completes if QUIT arrives after the 554 greeting
        let (port, handle) = spawn_mock_server(
            "554 5.3.2 service not available\r\n",
            vec![("QUIT", "221 Bye\r\n")],
        );
        let records = vec![MxRecord::new(10, "127.0.0.1")];
        let result = probe_mailbox(&records, &target(), &loopback_options(port));
        assert!(matches!(result, Err(ProbeError::Protocol(_))));
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires network stack"]
    fn connect_timeout_is_bounded() {
        // non-routable address: the SYN goes nowhere until the deadline
        let records = vec![MxRecord::new(10, "10.255.255.1")];
        let options = ProbeOptions {
            timeout: Duration::from_secs(1),
            ..ProbeOptions::default()
        };

        let start = Instant::now();
        let result = probe_mailbox(&records, &target(), &options);
        let elapsed = start.elapsed();

        let err = result.expect_err("nothing listens there");
        assert!(
            err.to_string().contains("timed out"),
            "unexpected error: {err}"
        );
        assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
    }
}
