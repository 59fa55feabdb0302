//! Synthetic access-log generation.
//!
//! Produces combined-format lines for trying the analyzer without a real
//! server log.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::fs;
use std::path::Path;

const IPS: [&str; 5] = [
    "192.168.1.10",
    "192.168.1.11",
    "10.0.0.2",
    "10.0.0.3",
    "127.0.0.1",
];

const METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];

const URLS: [&str; 7] = [
    "/index.html",
    "/dashboard",
    "/api/data",
    "/login",
    "/contact",
    "/about",
    "/products",
];

// 200 is listed three times to weight it
const STATUS_CODES: [u16; 6] = [200, 200, 200, 404, 500, 403];

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)",
    "curl/7.68.0",
    "PostmanRuntime/7.26.8",
];

/// Seconds in the window that generated timestamps fall into.
const WINDOW_SECONDS: i64 = 86_400;

fn pick<'a, T, R: Rng>(rng: &mut R, pool: &'a [T]) -> &'a T {
    &pool[rng.random_range(0..pool.len())]
}

/// Generate one line timestamped within the day before `now`.
pub fn generate_line<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> String {
    let ip = pick(rng, &IPS);
    let method = pick(rng, &METHODS);
    let url = pick(rng, &URLS);
    let status = pick(rng, &STATUS_CODES);
    let size: u32 = rng.random_range(100..=5000);
    let agent = pick(rng, &USER_AGENTS);
    let timestamp = now - Duration::seconds(rng.random_range(0..=WINDOW_SECONDS));

    format!(
        r#"{} - - [{}] "{} {} HTTP/1.1" {} {} "{}""#,
        ip,
        timestamp.format("%d/%b/%Y:%H:%M:%S +0000"),
        method,
        url,
        status,
        size,
        agent
    )
}

/// Generate `count` lines.
pub fn generate_lines<R: Rng>(rng: &mut R, count: usize, now: DateTime<Utc>) -> Vec<String> {
    (0..count).map(|_| generate_line(rng, now)).collect()
}

/// Write `count` random lines to `path`, creating its directory.
pub fn write_sample_log(path: &Path, count: usize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut content = generate_lines(&mut rand::rng(), count, Utc::now()).join("\n");
    content.push('\n');

    fs::write(path, content)
        .with_context(|| format!("Failed to write sample log to {}", path.display()))
}
