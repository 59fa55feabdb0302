//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Options left unset fall back to the
//! configuration file and then to built-in defaults.

use crate::models::RunStats;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code for invalid arguments or a runtime error.
pub const EXIT_FAILURE: i32 = 1;
/// Process exit code when `--fail-on-malformed` is set and lines were skipped.
pub const EXIT_MALFORMED: i32 = 2;

/// Weblog - web server access-log analyzer
///
/// Parses an Apache/Nginx access log, counts requests, 404 errors,
/// top URLs and top client addresses, and writes a summary report.
///
/// Examples:
///   weblog --logfile /var/log/nginx/access.log
///   weblog -l access.log -t 10 --stdout
///   weblog -l access.log --format json -o summary.json
///   weblog --generate-sample 500
///   weblog --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the web server access log
    #[arg(short, long, value_name = "FILE", env = "WEBLOG_LOGFILE")]
    pub logfile: Option<PathBuf>,

    /// Path to save the summary report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of top URLs and IP addresses to include
    #[arg(short, long, value_name = "N")]
    pub top: Option<usize>,

    /// File that receives a copy of the analysis log
    #[arg(long, value_name = "FILE", conflicts_with = "no_log_file")]
    pub log_file: Option<PathBuf>,

    /// Do not write the analysis log to a file
    #[arg(long)]
    pub no_log_file: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .weblog.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Report format (text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Print the report to stdout instead of writing it to a file
    #[arg(long)]
    pub stdout: bool,

    /// Add a breakdown of HTTP methods to the report
    #[arg(long)]
    pub track_methods: bool,

    /// Add a breakdown of status codes to the report
    #[arg(long)]
    pub track_status_codes: bool,

    /// Exit with code 2 if any line could not be parsed
    #[arg(long)]
    pub fail_on_malformed: bool,

    /// Generate a default .weblog.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Write COUNT synthetic log lines to the log file and exit
    #[arg(long, value_name = "COUNT")]
    pub generate_sample: Option<usize>,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain-text summary (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments, leaving the exit to the caller.
    ///
    /// Map a failure to an exit code with [`usage_exit_code`].
    pub fn parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Exit code after a completed analysis run.
    pub fn exit_code(&self, stats: &RunStats) -> i32 {
        if self.fail_on_malformed && stats.malformed > 0 {
            EXIT_MALFORMED
        } else {
            EXIT_SUCCESS
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.generate_sample == Some(0) {
            return Err("Sample count must be at least 1".to_string());
        }

        if let Some(ref logfile) = self.logfile {
            if logfile.as_os_str().is_empty() {
                return Err("Log file path must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Exit code for an argument parsing failure.
///
/// `--help` and `--version` arrive as errors that print to stdout; those
/// are not failures.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}
