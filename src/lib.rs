//! Web server access-log analysis.
//!
//! Raw access-log lines flow one way through three stages:
//!
//! - [`parser`] turns a line into a [`models::LogRecord`] or rejects it.
//! - [`analysis`] folds records into an [`models::AnalysisSummary`].
//! - [`report`] renders a summary as the fixed text layout or JSON.
//!
//! [`pipeline`] drives the stages over a line source and reports skipped
//! lines to a [`diagnostics::DiagnosticSink`].

pub mod analysis;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod sample;

pub use analysis::analyze;
pub use parser::parse_line;
pub use report::render;
