//! patchy - store and recall JACK connection patches.
//!
//! `patchy store` writes the current JACK connections as a JSON patch;
//! `patchy recall` makes the live connections match a stored patch,
//! disconnecting anything extra and connecting anything missing.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod duration;

use cli::{Cli, Command};
use config::Config;
use patchy_core::persistence;
use patchy_core::{
    DocumentStyle, MissingPolicy, PatchLocation, RecallOptions, RecallOutcome, recall,
    store_snapshot,
};
use patchy_jack::JackRegistry;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Usage errors exit with status 2 here
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref());
    let base_level = config.as_ref().map_or(config::DEFAULT_LOG_LEVEL, |c| c.log.level.as_str());
    init_logging(&cli.log_filter(base_level));

    let result = match config {
        Ok(config) => run(&cli, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e, io::stderr().lock());
            ExitCode::FAILURE
        }
    }
}

/// Report the error that ends the run, even when logging is switched off.
fn report_failure<W: Write>(err: &anyhow::Error, mut stderr: W) {
    if tracing::enabled!(Level::ERROR) {
        error!("{err:#}");
    } else {
        let _ = writeln!(stderr, "patchy: {err:#}");
    }
}

/// Log to stderr; stdout carries patch documents.
fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli, config: &Config) -> Result<()> {
    match &cli.command {
        Command::Store { file } => {
            let location = PatchLocation::from_arg(file.as_deref());
            let style = if cli.pretty || config.store.pretty {
                DocumentStyle::Pretty
            } else {
                DocumentStyle::Compact
            };

            let registry = JackRegistry::open()?;
            let patch = store_snapshot(&registry, &location, style)
                .with_context(|| format!("Failed to store patch to {location}"))?;
            info!(%location, connections = patch.len(), "Stored");
        }

        Command::Recall { file } => {
            let location = PatchLocation::from_arg(file.as_deref());
            let options = recall_options(cli, config)?;

            // Bad input is rejected before the server is touched
            let target = persistence::load(&location)
                .with_context(|| format!("Failed to load patch from {location}"))?;

            let registry = JackRegistry::open()?;
            match recall(&registry, &target, &options).await? {
                RecallOutcome::Applied(report) => {
                    info!(
                        %location,
                        disconnected = report.disconnected,
                        connected = report.connected,
                        "Recalled"
                    );
                }
                RecallOutcome::Planned(plan) => {
                    let mut out = io::stdout().lock();
                    for action in plan.actions() {
                        writeln!(out, "{action}")?;
                    }
                    out.flush()?;
                }
            }
        }
    }

    Ok(())
}

/// Merge recall flags over the configured defaults.
///
/// An explicit `-w` selects waiting even when the config asks for strict mode.
fn recall_options(cli: &Cli, config: &Config) -> Result<RecallOptions> {
    let strict = cli.strict || (config.recall.strict && cli.wait.is_none());
    let wait = match cli.wait {
        Some(wait) => wait,
        None => config.recall.wait()?,
    };
    let policy = if strict {
        if !wait.is_zero() {
            warn!(?wait, "Strict mode does not wait for missing ports, ignoring wait");
        }
        MissingPolicy::Strict
    } else {
        MissingPolicy::Wait
    };
    Ok(RecallOptions { wait, policy, dry_run: cli.dry_run })
}
