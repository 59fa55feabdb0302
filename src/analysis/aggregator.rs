//! Record aggregation and ranking.
//!
//! This module counts parsed records per tracked [`Dimension`] and turns the
//! counts into stably ordered top-N rankings.

use crate::models::{AnalysisSummary, Dimension, LogRecord, RankedEntry, NOT_FOUND};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Per-key occurrence counter that remembers first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FrequencyCounter {
    index: HashMap<String, usize>,
    entries: Vec<RankedEntry>,
}

impl FrequencyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `key`.
    pub fn increment(&mut self, key: &str) {
        if let Some(&slot) = self.index.get(key) {
            self.entries[slot].count += 1;
        } else {
            self.index.insert(key.to_string(), self.entries.len());
            self.entries.push(RankedEntry::new(key, 1));
        }
    }

    /// Entries by count descending, ties in first-seen order.
    ///
    /// `limit` truncates the ranking; `None` returns every key.
    pub fn ranked(&self, limit: Option<usize>) -> Vec<RankedEntry> {
        let mut ranking = self.entries.clone();
        // sort_by_key is stable, which keeps first-seen order for equal counts
        ranking.sort_by_key(|entry| Reverse(entry.count));
        if let Some(n) = limit {
            ranking.truncate(n);
        }
        ranking
    }
}

/// Single-pass aggregator over a stream of records.
///
/// A summary can be taken at any point; it always describes exactly the
/// records ingested so far.
#[derive(Debug, Clone)]
pub struct Aggregator {
    top_n: usize,
    total_requests: usize,
    not_found_count: usize,
    counters: Vec<(Dimension, FrequencyCounter)>,
}

impl Aggregator {
    /// Aggregator tracking client addresses and paths.
    pub fn new(top_n: usize) -> Self {
        Self::with_dimensions(top_n, &[])
    }

    /// Aggregator that additionally tracks `extra` dimensions.
    ///
    /// Client addresses and paths are always tracked; duplicates are ignored.
    pub fn with_dimensions(top_n: usize, extra: &[Dimension]) -> Self {
        let mut counters = vec![
            (Dimension::ClientAddress, FrequencyCounter::new()),
            (Dimension::Path, FrequencyCounter::new()),
        ];

        for &dimension in extra {
            if !counters.iter().any(|(d, _)| *d == dimension) {
                counters.push((dimension, FrequencyCounter::new()));
            }
        }

        Self {
            top_n,
            total_requests: 0,
            not_found_count: 0,
            counters,
        }
    }

    fn counter(&self, dimension: Dimension) -> Option<&FrequencyCounter> {
        self.counters
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, counter)| counter)
    }

    /// Fold one record into the counts.
    pub fn ingest(&mut self, record: &LogRecord) {
        self.total_requests += 1;
        if record.status_code == NOT_FOUND {
            self.not_found_count += 1;
        }

        for (dimension, counter) in &mut self.counters {
            counter.increment(&dimension.key(record));
        }
    }

    /// Snapshot the current counts as a summary.
    pub fn summary(&self) -> AnalysisSummary {
        let top = |dimension| {
            self.counter(dimension)
                .map(|c| c.ranked(Some(self.top_n)))
                .unwrap_or_default()
        };
        let full = |dimension| self.counter(dimension).map(|c| c.ranked(None));

        AnalysisSummary {
            total_requests: self.total_requests,
            not_found_count: self.not_found_count,
            top_paths: top(Dimension::Path),
            top_clients: top(Dimension::ClientAddress),
            methods: full(Dimension::Method),
            status_codes: full(Dimension::StatusCode),
        }
    }
}

/// Summarize `records`, keeping the `top_n` most frequent paths and clients.
pub fn analyze(records: &[LogRecord], top_n: usize) -> AnalysisSummary {
    analyze_with(records, top_n, &[])
}

/// Like [`analyze`], also producing breakdowns for `extra` dimensions.
pub fn analyze_with(records: &[LogRecord], top_n: usize, extra: &[Dimension]) -> AnalysisSummary {
    let mut aggregator = Aggregator::with_dimensions(top_n, extra);
    for record in records {
        aggregator.ingest(record);
    }
    aggregator.summary()
}
