//! Diagnostic reporting for pipeline runs.
//!
//! The pipeline never logs on its own; it reports skipped lines and the
//! finished summary to a [`DiagnosticSink`] supplied by the caller.

use crate::models::{AnalysisSummary, RunStats};
use crate::parser::LineFormatError;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often (in lines) the progress display is refreshed.
const PROGRESS_INTERVAL: usize = 1000;

/// Receiver for advisory pipeline events.
pub trait DiagnosticSink {
    /// A line was rejected by the parser. Called once per rejected line.
    fn skipped_line(&mut self, line_number: usize, line: &str, reason: &LineFormatError);

    /// The run finished and produced `summary`.
    fn summary(&mut self, summary: &AnalysisSummary, stats: &RunStats);

    /// A line was consumed, whatever its outcome.
    fn progress(&mut self, _stats: &RunStats) {}
}

/// Sink that forwards events to `tracing`, with an optional spinner.
pub struct TracingSink {
    progress: Option<ProgressBar>,
}

impl TracingSink {
    /// Create a sink; `show_progress` enables a line-count spinner.
    pub fn new(show_progress: bool) -> Self {
        let progress = show_progress.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        Self { progress }
    }

    /// Remove the spinner, if any.
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress {
            pb.finish_and_clear();
        }
    }

    fn emit(&self, f: impl FnOnce()) {
        match self.progress {
            Some(ref pb) => pb.suspend(f),
            None => f(),
        }
    }
}

impl DiagnosticSink for TracingSink {
    fn skipped_line(&mut self, line_number: usize, line: &str, reason: &LineFormatError) {
        self.emit(|| warn!("Malformed log line {} skipped ({}): {}", line_number, reason, line));
    }

    fn summary(&mut self, summary: &AnalysisSummary, stats: &RunStats) {
        self.emit(|| {
            info!(
                "Analysis summary: {} requests, {} 404 errors, {} of {} lines skipped",
                summary.total_requests, summary.not_found_count, stats.malformed, stats.lines_read
            );
            debug!("Top paths: {:?}", summary.top_paths);
            debug!("Top clients: {:?}", summary.top_clients);

            if stats.records == 0 {
                warn!("No valid log entries found");
            }
        });
    }

    fn progress(&mut self, stats: &RunStats) {
        if let Some(ref pb) = self.progress {
            if stats.lines_read % PROGRESS_INTERVAL == 0 {
                pb.set_message(format!("{} lines processed", stats.lines_read));
            }
        }
    }
}

impl Drop for TracingSink {
    fn drop(&mut self) {
        self.finish();
    }
}

/// A skipped line as seen by [`CollectingSink`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line_number: usize,
    pub text: String,
    pub reason: LineFormatError,
}

/// Sink that records every event, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub skipped: Vec<SkippedLine>,
    pub summaries: Vec<(AnalysisSummary, RunStats)>,
    pub progress_calls: usize,
}

#[cfg(test)]
impl DiagnosticSink for CollectingSink {
    fn skipped_line(&mut self, line_number: usize, line: &str, reason: &LineFormatError) {
        self.skipped.push(SkippedLine {
            line_number,
            text: line.to_string(),
            reason: reason.clone(),
        });
    }

    fn summary(&mut self, summary: &AnalysisSummary, stats: &RunStats) {
        self.summaries.push((summary.clone(), *stats));
    }

    fn progress(&mut self, _stats: &RunStats) {
        self.progress_calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RankedEntry;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Shared buffer the test subscriber writes formatted events into.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_target(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = log.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_zero_records_warns() {
        let output = capture(|| {
            let mut sink = TracingSink::new(false);
            let stats = RunStats {
                lines_read: 2,
                records: 0,
                malformed: 2,
            };
            sink.summary(&AnalysisSummary::default(), &stats);
        });

        let warning = output
            .lines()
            .find(|l| l.contains("No valid log entries found"))
            .unwrap_or_else(|| panic!("no zero-record warning in:\n{}", output));
        assert!(warning.contains("WARN"));
        assert!(output.contains("0 requests, 0 404 errors, 2 of 2 lines skipped"));
    }

    #[test]
    fn test_records_present_do_not_warn() {
        let summary = AnalysisSummary {
            total_requests: 1,
            not_found_count: 0,
            top_paths: vec![RankedEntry::new("/a", 1)],
            top_clients: vec![RankedEntry::new("10.0.0.1", 1)],
            methods: None,
            status_codes: None,
        };
        let stats = RunStats {
            lines_read: 1,
            records: 1,
            malformed: 0,
        };

        let output = capture(|| TracingSink::new(false).summary(&summary, &stats));

        assert!(output.contains("1 requests"));
        assert!(!output.contains("No valid log entries found"));
    }

    #[test]
    fn test_skipped_line_is_logged_as_warning() {
        let output = capture(|| {
            let mut sink = TracingSink::new(false);
            sink.skipped_line(3, "bad line", &LineFormatError::NoMatch);
            sink.progress(&RunStats::default());
        });

        assert!(output.contains("WARN"));
        assert!(output.contains("Malformed log line 3 skipped"));
        assert!(output.contains("bad line"));
    }

    #[test]
    fn test_collecting_sink() {
        let mut sink = CollectingSink::default();
        sink.skipped_line(1, "x", &LineFormatError::Empty);
        sink.progress(&RunStats::default());

        assert_eq!(sink.skipped.len(), 1);
        assert_eq!(sink.skipped[0].reason, LineFormatError::Empty);
        assert_eq!(sink.progress_calls, 1);
        assert!(sink.summaries.is_empty());
    }
}
