// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Epson Printer ink monitor
//
// Entry point. Initialises logging and services, then dispatches the
// command-line subcommand.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use uuid::Uuid;

use epson_printer_core::error::Result;
use epson_printer_integration::config_flow::{FlowResult, UserInput};

use services::app_services::AppServices;
use services::runner::run_entries;

#[derive(Parser, Debug)]
#[command(name = "epson-printer")]
#[command(about = "Monitor Epson printer ink and maintenance box levels")]
struct Cli {
    /// Directory holding config.json and entries.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a printer and save it as a new entry
    Setup {
        /// Host name, IP address or IPP URI of the printer
        #[arg(long)]
        host: String,

        /// Seconds between polls
        #[arg(long)]
        update_interval: Option<u64>,
    },
    /// List Epson printers announced on the local network
    Discover {
        /// Seconds to browse for
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List saved entries
    Entries {
        /// Print the entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved entry
    Remove {
        entry_id: Uuid,
    },
    /// Poll every saved entry until interrupted (default)
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let mut svc = AppServices::init(cli.data_dir.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Setup {
            host,
            update_interval,
        } => {
            let input = UserInput {
                host,
                update_interval,
            };
            match svc.setup(input).await? {
                (_, Some(entry)) => {
                    println!("{}  {}", entry.entry_id, entry.title);
                    Ok(ExitCode::SUCCESS)
                }
                (FlowResult::ShowForm { errors, .. }, None) => {
                    for (field, error) in errors {
                        eprintln!("{field}: {} ({})", error.message(), error.key());
                    }
                    Ok(ExitCode::FAILURE)
                }
                (FlowResult::CreateEntry { .. }, None) => Ok(ExitCode::FAILURE),
            }
        }
        Command::Discover { timeout } => {
            let printers = svc.discover(timeout.map(Duration::from_secs)).await?;
            if printers.is_empty() {
                println!("no Epson printers found");
            }
            for printer in printers {
                println!(
                    "{:<40} {}",
                    printer.host,
                    printer.make_and_model.as_deref().unwrap_or(&printer.name)
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Entries { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(svc.entries())?);
            } else {
                for entry in svc.entries() {
                    println!(
                        "{}  {}  every {}s  (added {})",
                        entry.entry_id,
                        entry.title,
                        entry.data.update_interval,
                        entry.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Remove { entry_id } => {
            let entry = svc.remove_entry(entry_id)?;
            println!("removed {}", entry.title);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run => {
            let entries = svc.entries().to_vec();
            if entries.is_empty() {
                tracing::warn!("no entries configured; add one with `epson-printer setup --host <HOST>`");
                return Ok(ExitCode::SUCCESS);
            }

            tracing::info!(
                entries = entries.len(),
                data_dir = %svc.data_dir().display(),
                request_timeout_secs = svc.config().request_timeout_secs,
                "Epson printer monitor starting"
            );
            let (stop_tx, stop_rx) = watch::channel(false);
            let runner = tokio::spawn(run_entries(
                entries,
                svc.factory(),
                svc.workers().clone(),
                stop_rx,
            ));

            tokio::signal::ctrl_c().await?;
            tracing::info!("shutting down");
            // Every receiver may already be gone if all entries stopped.
            let _ = stop_tx.send(true);
            if let Err(e) = runner.await {
                tracing::warn!(error = %e, "runner ended abnormally");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
