//! Command-line argument parsing for `stxgen`.
//!
//! Grounded on `peat-brubeck/src/cli.rs`'s `Cli` derive struct and its
//! `Config`-conversion method; the verbosity-flag-to-log-level mapping
//! follows the same "repeatable flag raises a floor, RUST_LOG can raise it
//! further" convention.

use std::path::PathBuf;

#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    V3,
    V3_2,
}

/// Command-line arguments for `stxgen`.
#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "stxgen")]
#[command(about = "Compiles sequence-transform rule files into a firmware trie", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the config document.
    #[arg(short = 'c', long = "config", default_value = "sequence_transform_config.json")]
    pub config: PathBuf,

    /// Directory to write the generated headers into.
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,

    /// Raise log verbosity; repeatable.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-fatal warning output.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Override the format selected by the config document.
    #[arg(long = "format")]
    pub format: Option<FormatArg>,
}

#[cfg(feature = "cli")]
impl Cli {
    /// Maps the repeatable `-v` flag (and `--quiet`) onto a `log` level
    /// filter floor; `RUST_LOG` can still raise it further via `env_logger`.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
