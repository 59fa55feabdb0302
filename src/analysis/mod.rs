//! Analysis modules.
//!
//! Aggregation of parsed records into frequency summaries.

pub mod aggregator;

pub use aggregator::*;
