//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};

use crate::duration::parse_duration;

/// Log levels from quietest to loudest.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Parser)]
#[command(name = "patchy")]
#[command(about = "Store and recall JACK audio connections")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// (recall) wait this long for missing ports, e.g. 500ms, 10s, 1m30s
    #[arg(short, long, global = true, value_parser = parse_duration)]
    pub wait: Option<Duration>,

    /// (recall) fail on the first missing port instead of waiting
    #[arg(long, global = true, conflicts_with = "wait")]
    pub strict: bool,

    /// (recall) print the planned changes without applying them
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// (store) indent the written document
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Less log output (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save the current connections to FILE, or stdout
    #[command(visible_aliases = ["s", "sto"])]
    Store {
        /// Patch file, `-` for stdout
        file: Option<String>,
    },

    /// Restore the connections in FILE, or stdin
    #[command(visible_aliases = ["r", "rcl"])]
    Recall {
        /// Patch file, `-` for stdin
        file: Option<String>,
    },
}

impl Cli {
    /// Tracing filter for this run, starting from the configured `base`.
    ///
    /// `-v`/`-q` step through the standard levels. A base that is not a plain
    /// level is kept as is when neither flag is given.
    #[must_use]
    pub fn log_filter(&self, base: &str) -> String {
        if self.verbose == 0 && self.quiet == 0 {
            return base.to_string();
        }
        let start = LEVELS.iter().position(|l| l.eq_ignore_ascii_case(base)).unwrap_or(1);
        let index = (start + usize::from(self.verbose))
            .saturating_sub(usize::from(self.quiet))
            .min(LEVELS.len() - 1);
        LEVELS[index].to_string()
    }
}
