//! Configuration file handling.
//!
//! This module handles loading `.weblog.toml` files and merging them
//! with command-line arguments.

use crate::cli::OutputFormat;
use crate::models::Dimension;
use crate::parser::{LogParser, PatternError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".weblog.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Line grammar settings.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Diagnostic logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where log lines are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Access log to analyze.
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
        }
    }
}

fn default_log_file() -> String {
    "sample_logs/access.log".to_string()
}

/// Line grammar override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Regular expression with named captures `ip`, `time`, `method`,
    /// `path`, `status` and `size`. The built-in grammar is used if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Summary report output path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Number of top URLs and IP addresses to show.
    #[serde(default = "default_top_count")]
    pub top_count: usize,

    /// Include an HTTP method breakdown.
    #[serde(default)]
    pub track_methods: bool,

    /// Include a status code breakdown.
    #[serde(default)]
    pub track_status_codes: bool,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            top_count: default_top_count(),
            track_methods: false,
            track_status_codes: false,
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> String {
    "reports/summary_report.txt".to_string()
}

fn default_top_count() -> usize {
    5
}

/// Diagnostic logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// File that receives a copy of the analysis log. Unset disables it.
    #[serde(default = "default_analysis_log")]
    pub file: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_analysis_log(),
            verbose: false,
        }
    }
}

fn default_analysis_log() -> Option<String> {
    Some("logs/analysis.log".to_string())
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.weblog.toml` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when they were given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref logfile) = args.logfile {
            self.input.log_file = logfile.to_string_lossy().into_owned();
        }

        if let Some(ref output) = args.output {
            self.report.output = output.to_string_lossy().into_owned();
        }
        if let Some(top) = args.top {
            self.report.top_count = top;
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }

        // Flags only ever switch features on
        if args.track_methods {
            self.report.track_methods = true;
        }
        if args.track_status_codes {
            self.report.track_status_codes = true;
        }

        if args.no_log_file {
            self.logging.file = None;
        } else if let Some(ref log_file) = args.log_file {
            self.logging.file = Some(log_file.to_string_lossy().into_owned());
        }

        if args.verbose {
            self.logging.verbose = true;
        }
    }

    /// Extra dimensions the report should break down.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dimensions = Vec::new();
        if self.report.track_methods {
            dimensions.push(Dimension::Method);
        }
        if self.report.track_status_codes {
            dimensions.push(Dimension::StatusCode);
        }
        dimensions
    }

    /// Build the line parser for the configured grammar.
    pub fn parser(&self) -> std::result::Result<LogParser, PatternError> {
        match self.parser.pattern {
            Some(ref pattern) => LogParser::with_pattern(pattern),
            None => Ok(LogParser::new()),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
