use std::time::Duration;

use clap::{Parser, Subcommand};
use mailprobe_lib::{ProbeOptions, ValidationMode};

#[derive(Parser)]
#[command(name = "mailprobe-cli")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long)]
    pub stdin: bool,

    /// write report to file (JSON/NDJSON/CSV selon --format)
    #[arg(long)]
    pub out: Option<String>,

    /// mode: strict|relaxed
    #[arg(long, default_value = "strict")]
    pub mode: String,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human")]
    pub format: String,

    /// port SMTP cible
    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// nom annoncé dans EHLO/HELO
    #[arg(long)]
    pub helo: Option<String>,

    /// enveloppe MAIL FROM (par défaut postmaster@domaine)
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// timeout réseau (ms)
    #[arg(long = "timeout", default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// timeout DNS (ms)
    #[arg(long = "dns-timeout", default_value_t = 5_000)]
    pub dns_timeout_ms: u64,

    /// nombre maximum d'MX interrogés
    #[arg(long = "max-mx", default_value_t = 1)]
    pub max_mx: usize,

    /// requiert STARTTLS si proposé
    #[arg(long = "require-starttls")]
    pub require_starttls: bool,

    /// autorise IPv6
    #[arg(long)]
    pub ipv6: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// teste l'existence de la boîte aux lettres (MX + RCPT TO)
    Verify {
        /// mode: strict|relaxed (prend le pas sur l'option globale)
        #[arg(long)]
        mode: Option<String>,
        email: String,
    },
    /// résout les enregistrements MX du domaine
    Mx { domain: String },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn parsed_mode(&self) -> ValidationMode {
        mode_from_str(&self.mode)
    }

    pub fn probe_options(&self) -> ProbeOptions {
        let mut options = ProbeOptions::default();
        options.port = self.port;
        if let Some(helo) = &self.helo {
            options.helo_name = helo.clone();
        }
        if let Some(from) = &self.mail_from {
            options.mail_from = from.clone();
        }
        options.timeout = Duration::from_millis(self.timeout_ms);
        options.dns_timeout = Duration::from_millis(self.dns_timeout_ms);
        options.max_servers = self.max_mx;
        options.require_starttls = self.require_starttls;
        options.ipv6 = self.ipv6;
        options
    }
}

pub fn mode_from_str(s: &str) -> ValidationMode {
    match s {
        "relaxed" => ValidationMode::Relaxed,
        _ => ValidationMode::Strict,
    }
}
