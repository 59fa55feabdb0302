//! The read → parse → aggregate pipeline and its I/O boundary.
//!
//! Parse failures stay inside the run and are only reported to the
//! diagnostic sink. The caller only sees errors from reading the source
//! and from writing the report.

use crate::analysis::Aggregator;
use crate::diagnostics::DiagnosticSink;
use crate::models::{AnalysisSummary, Dimension, RunStats};
use crate::parser::LogParser;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Failures a caller has to deal with.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("log source not found or unreadable: {}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read log source at line {line}")]
    SourceRead {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report to {}", path.display())]
    RenderWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub summary: AnalysisSummary,
    pub stats: RunStats,
}

/// Lines of a buffered reader, decoded lossily and without line endings.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let text = String::from_utf8_lossy(&self.buf);
                Some(Ok(text.trim_end_matches(['\r', '\n']).to_string()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Open a log file as a line source.
///
/// Anything readable is accepted, including pipes and character devices
/// such as `/dev/stdin`. Directories are rejected up front.
pub fn open_source(path: &Path) -> Result<LineSource<BufReader<File>>, PipelineError> {
    let unavailable = |source| PipelineError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(unavailable)?;
    if metadata.is_dir() {
        return Err(unavailable(io::Error::new(
            io::ErrorKind::InvalidInput,
            "is a directory",
        )));
    }

    let file = File::open(path).map_err(unavailable)?;
    debug!("Opened log source: {}", path.display());

    Ok(LineSource::new(BufReader::new(file)))
}

/// Write a rendered report, creating parent directories as needed.
pub fn write_report(path: &Path, content: &str) -> Result<(), PipelineError> {
    let failed = |source| PipelineError::RenderWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(failed)?;
    }

    fs::write(path, content).map_err(failed)
}

/// Configured pipeline: one grammar, one ranking size, tracked dimensions.
#[derive(Debug, Clone)]
pub struct Pipeline {
    parser: LogParser,
    top_n: usize,
    extra_dimensions: Vec<Dimension>,
}

impl Pipeline {
    pub fn new(parser: LogParser, top_n: usize) -> Self {
        Self {
            parser,
            top_n,
            extra_dimensions: Vec::new(),
        }
    }

    /// Also produce breakdowns for `dimensions`.
    pub fn with_dimensions(mut self, dimensions: &[Dimension]) -> Self {
        self.extra_dimensions.extend_from_slice(dimensions);
        self
    }

    /// Run over a fallible line source such as [`open_source`].
    ///
    /// A read error aborts the run with [`PipelineError::SourceRead`].
    pub fn run<I, S>(
        &self,
        lines: I,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<PipelineOutcome, PipelineError>
    where
        I: IntoIterator<Item = io::Result<S>>,
        S: AsRef<str>,
    {
        let mut run = RunState::new(self);

        for line in lines {
            let line = line.map_err(|source| PipelineError::SourceRead {
                line: run.stats.lines_read + 1,
                source,
            })?;
            run.feed(&self.parser, line.as_ref(), sink);
        }

        Ok(run.finish(sink))
    }

    /// Run over in-memory lines.
    pub fn run_lines<I, S>(&self, lines: I, sink: &mut dyn DiagnosticSink) -> PipelineOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut run = RunState::new(self);

        for line in lines {
            run.feed(&self.parser, line.as_ref(), sink);
        }

        run.finish(sink)
    }
}

struct RunState {
    aggregator: Aggregator,
    stats: RunStats,
}

impl RunState {
    fn new(pipeline: &Pipeline) -> Self {
        Self {
            aggregator: Aggregator::with_dimensions(pipeline.top_n, &pipeline.extra_dimensions),
            stats: RunStats::default(),
        }
    }

    fn feed(&mut self, parser: &LogParser, line: &str, sink: &mut dyn DiagnosticSink) {
        self.stats.lines_read += 1;

        match parser.parse(line) {
            Ok(record) => {
                self.aggregator.ingest(&record);
                self.stats.records += 1;
            }
            Err(reason) => {
                self.stats.malformed += 1;
                sink.skipped_line(self.stats.lines_read, line.trim_end(), &reason);
            }
        }

        sink.progress(&self.stats);
    }

    fn finish(self, sink: &mut dyn DiagnosticSink) -> PipelineOutcome {
        let summary = self.aggregator.summary();
        sink.summary(&summary, &self.stats);

        PipelineOutcome {
            summary,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::models::RankedEntry;
    use crate::parser::LineFormatError;
    use std::io::Cursor;
    use tempfile::TempDir;

    const SCENARIO: [&str; 4] = [
        r#"10.0.0.1 - - [01/Jan/2024:00:00:00 +0000] "GET /a HTTP/1.1" 200 100"#,
        r#"10.0.0.1 - - [01/Jan/2024:00:00:01 +0000] "GET /a HTTP/1.1" 404 0"#,
        "bad line",
        r#"10.0.0.2 - - [01/Jan/2024:00:00:02 +0000] "GET /b HTTP/1.1" 200 50"#,
    ];

    fn pipeline() -> Pipeline {
        Pipeline::new(LogParser::new(), 5)
    }

    #[test]
    fn test_scenario() {
        let mut sink = CollectingSink::default();
        let outcome = pipeline().run_lines(SCENARIO, &mut sink);

        assert_eq!(outcome.summary.total_requests, 3);
        assert_eq!(outcome.summary.not_found_count, 1);
        assert_eq!(
            outcome.summary.top_paths,
            vec![RankedEntry::new("/a", 2), RankedEntry::new("/b", 1)]
        );
        assert_eq!(
            outcome.summary.top_clients,
            vec![
                RankedEntry::new("10.0.0.1", 2),
                RankedEntry::new("10.0.0.2", 1)
            ]
        );

        assert_eq!(sink.skipped.len(), 1);
        assert_eq!(sink.skipped[0].line_number, 3);
        assert_eq!(sink.skipped[0].text, "bad line");
        assert_eq!(sink.skipped[0].reason, LineFormatError::NoMatch);

        assert_eq!(
            outcome.stats,
            RunStats {
                lines_read: 4,
                records: 3,
                malformed: 1
            }
        );
        assert_eq!(sink.summaries.len(), 1);
        assert_eq!(sink.summaries[0].0, outcome.summary);
        assert_eq!(sink.progress_calls, 4);
    }

    #[test]
    fn test_total_excludes_malformed_lines() {
        let lines = ["nope", "", "still nope"];
        let mut sink = CollectingSink::default();
        let outcome = pipeline().run_lines(lines, &mut sink);

        assert_eq!(outcome.summary, AnalysisSummary::default());
        assert_eq!(outcome.stats.malformed, 3);
        assert_eq!(sink.skipped[1].reason, LineFormatError::Empty);
    }

    #[test]
    fn test_run_over_reader() {
        let text = SCENARIO.join("\r\n") + "\n";
        let source = LineSource::new(Cursor::new(text.into_bytes()));

        let mut sink = CollectingSink::default();
        let outcome = pipeline().run(source, &mut sink).unwrap();

        assert_eq!(outcome.stats.lines_read, 4);
        assert_eq!(outcome.summary.total_requests, 3);
    }

    #[test]
    fn test_line_source_decodes_lossily() {
        let bytes = b"ok\n\xff\xfe\nlast".to_vec();
        let lines: Vec<String> = LineSource::new(Cursor::new(bytes))
            .collect::<io::Result<_>>()
            .unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ok");
        assert!(lines[1].contains('\u{FFFD}'));
        assert_eq!(lines[2], "last");
    }

    #[test]
    fn test_read_error_is_surfaced() {
        let lines: Vec<io::Result<&str>> = vec![
            Ok(SCENARIO[0]),
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire")),
        ];

        let mut sink = CollectingSink::default();
        let err = pipeline().run(lines, &mut sink).unwrap_err();

        assert!(matches!(err, PipelineError::SourceRead { line: 2, .. }));
        assert!(sink.summaries.is_empty());
    }

    #[test]
    fn test_tracked_dimensions_flow_through() {
        let mut sink = CollectingSink::default();
        let outcome = pipeline()
            .with_dimensions(&[Dimension::StatusCode])
            .run_lines(SCENARIO, &mut sink);

        assert_eq!(outcome.summary.methods, None);
        assert_eq!(
            outcome.summary.status_codes,
            Some(vec![RankedEntry::new("200", 2), RankedEntry::new("404", 1)])
        );
    }

    #[test]
    fn test_open_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = open_source(&dir.path().join("absent.log")).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_open_source_rejects_directory() {
        let dir = TempDir::new().unwrap();
        let err = open_source(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_open_source_accepts_character_device() {
        let mut sink = CollectingSink::default();
        let outcome = pipeline()
            .run(open_source(Path::new("/dev/null")).unwrap(), &mut sink)
            .unwrap();

        assert_eq!(outcome.stats.lines_read, 0);
        assert_eq!(sink.summaries.len(), 1);
    }

    #[test]
    fn test_empty_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.log");
        fs::write(&path, "").unwrap();

        let mut sink = CollectingSink::default();
        let outcome = pipeline()
            .run(open_source(&path).unwrap(), &mut sink)
            .unwrap();

        assert_eq!(outcome.summary.total_requests, 0);
        assert_eq!(outcome.stats.lines_read, 0);
        assert_eq!(sink.summaries.len(), 1);
    }

    #[test]
    fn test_write_report_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("summary.txt");

        write_report(&path, "hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_write_report_failure() {
        let dir = TempDir::new().unwrap();
        // the target is an existing directory, so the write must fail
        let err = write_report(dir.path(), "hello").unwrap_err();
        assert!(matches!(err, PipelineError::RenderWrite { .. }));
    }
}
