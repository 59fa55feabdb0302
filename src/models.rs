//! Data models for the log analyzer.
//!
//! This module contains the core data structures that flow through the
//! pipeline: parsed records, the aggregate summary, and report metadata.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Status code counted separately in every summary.
pub const NOT_FOUND: u16 = 404;

/// One successfully parsed access-log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Client address as written (dotted digits, not range-checked).
    pub client_address: String,
    /// Raw text between the timestamp brackets.
    pub timestamp: String,
    /// Uppercase HTTP verb.
    pub method: String,
    /// Request target exactly as written.
    pub path: String,
    /// Three-digit HTTP status.
    pub status_code: u16,
    /// Response size in bytes; `-` in the source maps to 0.
    pub response_size: u64,
}

/// A record field that can be counted by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    ClientAddress,
    Path,
    Method,
    StatusCode,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::ClientAddress => write!(f, "client address"),
            Dimension::Path => write!(f, "path"),
            Dimension::Method => write!(f, "method"),
            Dimension::StatusCode => write!(f, "status code"),
        }
    }
}

impl Dimension {
    /// Extract the counting key for this dimension from a record.
    pub fn key<'a>(&self, record: &'a LogRecord) -> Cow<'a, str> {
        match self {
            Dimension::ClientAddress => Cow::Borrowed(&record.client_address),
            Dimension::Path => Cow::Borrowed(&record.path),
            Dimension::Method => Cow::Borrowed(&record.method),
            Dimension::StatusCode => Cow::Owned(record.status_code.to_string()),
        }
    }
}

/// A (key, count) pair in a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub key: String,
    pub count: usize,
}

impl RankedEntry {
    pub fn new(key: impl Into<String>, count: usize) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Aggregate statistics over one run's records.
///
/// Every ranking is ordered by count descending, with ties kept in the
/// order their keys first appeared in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Number of parsed records (malformed lines are not counted).
    pub total_requests: usize,
    /// Records whose status is 404.
    pub not_found_count: usize,
    /// Most requested paths, at most `top_n` entries.
    pub top_paths: Vec<RankedEntry>,
    /// Most active clients, at most `top_n` entries.
    pub top_clients: Vec<RankedEntry>,
    /// Full method breakdown, when method tracking is enabled.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub methods: Option<Vec<RankedEntry>>,
    /// Full status code breakdown, when status tracking is enabled.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_codes: Option<Vec<RankedEntry>>,
}

/// Line counts gathered while driving the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Raw lines pulled from the source.
    pub lines_read: usize,
    /// Lines that produced a record.
    pub records: usize,
    /// Lines rejected by the parser.
    pub malformed: usize,
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the log lines came from.
    pub source: String,
    /// When the report was generated (host-local time).
    pub generated_at: DateTime<Local>,
    /// Ranking size requested for this run.
    pub top_n: usize,
    /// Line counts for this run.
    pub stats: RunStats,
}

/// A summary together with its metadata, used for structured output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: AnalysisSummary,
}
