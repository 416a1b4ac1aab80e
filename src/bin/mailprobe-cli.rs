use std::io::{self, BufRead};

use anyhow::{Context, Result};

#[path = "mailprobe-cli/args.rs"]
mod args;
#[path = "mailprobe-cli/output.rs"]
mod output;

use args::{Cli, Commands, mode_from_str};
use mailprobe_lib::{MxStatus, Response, Verifier, check_mx_with_timeout};
use output::OutputRow;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut mode = cli.parsed_mode();

    if let Some(Commands::Mx { domain }) = &cli.cmd {
        return run_mx(domain, &cli);
    }

    let mut emails: Vec<String> = Vec::new();
    if cli.stdin {
        for line in io::stdin().lock().lines() {
            let email = line.context("read stdin")?;
            if !email.trim().is_empty() {
                emails.push(email);
            }
        }
    } else if let Some(Commands::Verify {
        mode: sub_mode,
        email,
    }) = &cli.cmd
    {
        if let Some(m) = sub_mode.as_deref() {
            mode = mode_from_str(m); // la sous-commande a priorité
        }
        emails.push(email.clone());
    } else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    // une seule instance, configuration immuable
    let verifier = Verifier::with_mode(mode, cli.probe_options());
    let rows: Vec<OutputRow> = emails
        .iter()
        .map(|email| OutputRow::new(email.clone(), Response::from(verifier.verify(email))))
        .collect();

    output::write_reports(&rows, &cli)?;

    // codes de sortie : 0 OK, 2 verdicts en erreur, 1 fatal
    if output::any_error(&rows) {
        std::process::exit(2);
    }
    Ok(())
}

fn run_mx(domain: &str, cli: &Cli) -> Result<()> {
    let options = cli.probe_options();
    match check_mx_with_timeout(domain, options.dns_timeout)? {
        MxStatus::Records(records) => {
            for record in records {
                println!("{:>5} {}", record.priority, record.host);
            }
        }
        MxStatus::NoRecords => println!("no MX records"),
    }
    Ok(())
}
