//! Access-log line parsing.
//!
//! Lines are matched against a single grammar (the Apache/Nginx "common"
//! shape by default) and turned into [`LogRecord`]s. A line either yields
//! all six fields or nothing at all.

use crate::models::LogRecord;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Default grammar:
/// `<ip> - - [<time>] "<METHOD> <path> <protocol>" <status> <size>`
///
/// Anchored at the start of the line. Anything after the size field (for
/// example the referer and user agent of the combined format) is ignored.
/// Digits are ASCII only; the path is any run of non-whitespace.
pub const DEFAULT_PATTERN: &str = concat!(
    r"^(?P<ip>[0-9]+(?:\.[0-9]+)*)\s+-\s+-\s+",
    r"\[(?P<time>[^\]]+)\]\s+",
    r#""(?P<method>[A-Z]+)\s+(?P<path>\S+)\s+(?P<protocol>[^\s"]+)"\s+"#,
    r"(?P<status>[0-9]{3})\s+",
    r"(?P<size>[0-9]+|-)(?:\s|$)",
);

/// Capture groups every grammar must provide.
pub const REQUIRED_CAPTURES: [&str; 6] = ["ip", "time", "method", "path", "status", "size"];

static DEFAULT_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DEFAULT_PATTERN).expect("Failed to compile default access log pattern")
});

/// Why a line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineFormatError {
    #[error("empty line")]
    Empty,

    #[error("line does not match the access log grammar")]
    NoMatch,

    #[error("status code is not a valid number: {0}")]
    InvalidStatus(String),

    #[error("response size is not a valid number: {0}")]
    InvalidSize(String),
}

/// A custom grammar that cannot be used.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid line pattern: {0}")]
    Invalid(#[from] regex::Error),

    #[error("line pattern is missing the `{0}` capture group")]
    MissingCapture(&'static str),
}

/// Parser for one access-log grammar.
#[derive(Debug, Clone)]
pub struct LogParser {
    grammar: Regex,
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogParser {
    /// Create a parser for the default grammar.
    pub fn new() -> Self {
        Self {
            grammar: DEFAULT_GRAMMAR.clone(),
        }
    }

    /// Create a parser for a custom grammar.
    ///
    /// The pattern must define the named captures in [`REQUIRED_CAPTURES`].
    pub fn with_pattern(pattern: &str) -> Result<Self, PatternError> {
        let grammar = Regex::new(pattern)?;

        for name in REQUIRED_CAPTURES {
            if !grammar.capture_names().flatten().any(|n| n == name) {
                return Err(PatternError::MissingCapture(name));
            }
        }

        Ok(Self { grammar })
    }

    /// The pattern this parser matches against.
    pub fn pattern(&self) -> &str {
        self.grammar.as_str()
    }

    /// Parse one line, reporting why it was rejected.
    pub fn parse(&self, raw: &str) -> Result<LogRecord, LineFormatError> {
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(LineFormatError::Empty);
        }

        let caps = self
            .grammar
            .captures(line)
            .ok_or(LineFormatError::NoMatch)?;

        // Optional groups in a custom pattern may not participate in a match.
        let field = |name: &str| caps.name(name).map(|m| m.as_str());
        let (Some(ip), Some(time), Some(method), Some(path), Some(status), Some(size)) = (
            field("ip"),
            field("time"),
            field("method"),
            field("path"),
            field("status"),
            field("size"),
        ) else {
            return Err(LineFormatError::NoMatch);
        };

        let status_code = status
            .parse::<u16>()
            .map_err(|_| LineFormatError::InvalidStatus(status.to_string()))?;

        let response_size = if size == "-" {
            0
        } else {
            size.parse::<u64>()
                .map_err(|_| LineFormatError::InvalidSize(size.to_string()))?
        };

        Ok(LogRecord {
            client_address: ip.to_string(),
            timestamp: time.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            status_code,
            response_size,
        })
    }

    /// Parse one line, discarding the rejection reason.
    pub fn parse_line(&self, raw: &str) -> Option<LogRecord> {
        self.parse(raw).ok()
    }
}

/// Parse one line with the default grammar.
pub fn parse_line(raw: &str) -> Option<LogRecord> {
    LogParser::new().parse_line(raw)
}
