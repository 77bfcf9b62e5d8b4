#[path = "mailprobe-cli/args.rs"]
mod args;
#[path = "mailprobe-cli/output.rs"]
mod output;

use std::io::{self, BufRead};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use args::{Cli, Commands};
use mailprobe_lib::{ValidatorResult, validate};

// codes de sortie : 0 OK, 2 invalides, 1 fatal
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing(&cli);

    match run(&cli) {
        Ok(rows) if output::any_invalid(&rows) => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> Result<Vec<ValidatorResult>> {
    let emails = if cli.stdin {
        let mut emails = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let email = line.trim();
            if !email.is_empty() {
                emails.push(email.to_string());
            }
        }
        emails
    } else if let Some(Commands::Validate { email }) = &cli.cmd {
        vec![email.clone()]
    } else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(Vec::new());
    };

    let config = cli.build_config()?;
    let mut rows = Vec::with_capacity(emails.len());
    for email in &emails {
        let row = validate(email, &config, cli.validation_type)
            .with_context(|| format!("validate {email}"))?;
        rows.push(row);
    }

    output::write_reports(&rows, cli.format, cli.out.as_deref())?;
    Ok(rows)
}
