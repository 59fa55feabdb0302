//! Summary report generation.
//!
//! This module renders an [`AnalysisSummary`] as the fixed plain-text
//! summary layout, or a [`Report`] as JSON.

use crate::models::{AnalysisSummary, RankedEntry, Report};
use anyhow::Result;
use chrono::{DateTime, Local};

const TITLE: &str = "===== Web Log Summary =====";
const CLOSING_RULE: &str = "============================";

/// Format of the "Report Generated" line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render the text report stamped with the current local time.
pub fn render(summary: &AnalysisSummary) -> String {
    render_at(summary, &Local::now())
}

/// Render the text report stamped with `generated_at`.
///
/// Rankings are written in the order the summary holds them. Lines are
/// joined with `\n` and there is no trailing newline.
pub fn render_at(summary: &AnalysisSummary, generated_at: &DateTime<Local>) -> String {
    let mut lines = generate_header(summary, generated_at);

    lines.push(String::new());
    lines.extend(generate_ranking("Top Requested URLs:", &summary.top_paths, "hits"));

    lines.push(String::new());
    lines.extend(generate_ranking(
        "Top IP Addresses:",
        &summary.top_clients,
        "requests",
    ));

    if let Some(ref methods) = summary.methods {
        lines.push(String::new());
        lines.extend(generate_ranking("HTTP Methods:", methods, "requests"));
    }

    if let Some(ref status_codes) = summary.status_codes {
        lines.push(String::new());
        lines.extend(generate_ranking("Status Codes:", status_codes, "responses"));
    }

    lines.push(CLOSING_RULE.to_string());

    lines.join("\n")
}

/// Generate the title and headline counts.
fn generate_header(summary: &AnalysisSummary, generated_at: &DateTime<Local>) -> Vec<String> {
    vec![
        TITLE.to_string(),
        format!(
            "Report Generated: {}",
            generated_at.format(TIMESTAMP_FORMAT)
        ),
        format!("Total Requests: {}", summary.total_requests),
        format!("404 Errors: {}", summary.not_found_count),
    ]
}

/// Generate one titled ranking block.
fn generate_ranking(title: &str, entries: &[RankedEntry], unit: &str) -> Vec<String> {
    let mut block = Vec::with_capacity(entries.len() + 1);
    block.push(title.to_string());

    for entry in entries {
        block.push(format!("  {} - {} {}", entry.key, entry.count, unit));
    }

    block
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportMetadata, RunStats};
    use chrono::TimeZone;

    fn fixed_instant() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 12, 30, 45).unwrap()
    }

    fn create_test_summary() -> AnalysisSummary {
        AnalysisSummary {
            total_requests: 3,
            not_found_count: 1,
            top_paths: vec![RankedEntry::new("/a", 2), RankedEntry::new("/b", 1)],
            top_clients: vec![
                RankedEntry::new("10.0.0.1", 2),
                RankedEntry::new("10.0.0.2", 1),
            ],
            methods: None,
            status_codes: None,
        }
    }

    #[test]
    fn test_render_layout() {
        let text = render_at(&create_test_summary(), &fixed_instant());

        let expected = "\
===== Web Log Summary =====
Report Generated: 2024-01-01 12:30:45
Total Requests: 3
404 Errors: 1

Top Requested URLs:
  /a - 2 hits
  /b - 1 hits

Top IP Addresses:
  10.0.0.1 - 2 requests
  10.0.0.2 - 1 requests
============================";

        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_empty_summary() {
        let text = render_at(&AnalysisSummary::default(), &fixed_instant());

        let expected = "\
===== Web Log Summary =====
Report Generated: 2024-01-01 12:30:45
Total Requests: 0
404 Errors: 0

Top Requested URLs:

Top IP Addresses:
============================";

        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_keeps_summary_order() {
        let mut summary = create_test_summary();
        summary.top_paths = vec![RankedEntry::new("/z", 1), RankedEntry::new("/a", 1)];

        let text = render_at(&summary, &fixed_instant());
        let z = text.find("/z - 1 hits").unwrap();
        let a = text.find("/a - 1 hits").unwrap();
        assert!(z < a);
    }

    #[test]
    fn test_render_breakdowns() {
        let mut summary = create_test_summary();
        summary.methods = Some(vec![RankedEntry::new("GET", 3)]);
        summary.status_codes = Some(vec![
            RankedEntry::new("200", 2),
            RankedEntry::new("404", 1),
        ]);

        let text = render_at(&summary, &fixed_instant());

        assert!(text.contains("\n\nHTTP Methods:\n  GET - 3 requests\n"));
        assert!(text.contains("\n\nStatus Codes:\n  200 - 2 responses\n  404 - 1 responses\n"));
        assert!(text.ends_with(CLOSING_RULE));
    }

    #[test]
    fn test_render_is_deterministic_apart_from_timestamp() {
        let summary = create_test_summary();
        let first = render_at(&summary, &fixed_instant());
        let second = render_at(&summary, &fixed_instant());
        assert_eq!(first, second);

        let now = render(&summary);
        let strip = |s: &str| {
            s.lines()
                .filter(|l| !l.starts_with("Report Generated:"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(strip(&first), strip(&now));
    }

    #[test]
    fn test_generate_json_report() {
        let report = Report {
            metadata: ReportMetadata {
                source: "access.log".to_string(),
                generated_at: fixed_instant(),
                top_n: 5,
                stats: RunStats {
                    lines_read: 4,
                    records: 3,
                    malformed: 1,
                },
            },
            summary: create_test_summary(),
        };

        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"source\": \"access.log\""));
        assert!(json.contains("\"total_requests\": 3"));
        assert!(json.contains("\"top_paths\""));
        assert!(json.contains("\"malformed\": 1"));
    }
}
