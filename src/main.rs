//! Weblog - web server access-log analyzer
//!
//! A CLI tool that parses Apache/Nginx access logs, aggregates request
//! statistics and writes a summary report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing log file, unwritable report, bad config, etc.)
//!   2 - Malformed lines were skipped and --fail-on-malformed was set

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use weblog::cli::{self, Args, OutputFormat, EXIT_FAILURE, EXIT_MALFORMED};
use weblog::config::{Config, DEFAULT_CONFIG_FILE};
use weblog::diagnostics::TracingSink;
use weblog::models::{Report, ReportMetadata};
use weblog::pipeline::{self, Pipeline};
use weblog::{report, sample};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = match Args::parse_args() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(cli::usage_exit_code(&e));
        }
    };

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_FAILURE);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Configuration decides where the analysis log goes, so it comes first
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };
    config.merge_with_args(&args);

    if let Err(e) = init_logging(&args, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(EXIT_FAILURE);
    }

    info!("Weblog v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_source {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    if let Some(count) = args.generate_sample {
        return handle_generate_sample(&config, count);
    }

    // Run the analysis
    match run_analysis(&args, &config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Log analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

/// Handle --init-config: generate a default .weblog.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(EXIT_FAILURE);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the log file, report path, top count, and more.");
    Ok(())
}

/// Handle --generate-sample: write synthetic lines to the configured log file.
fn handle_generate_sample(config: &Config, count: usize) -> Result<()> {
    let path = PathBuf::from(&config.input.log_file);
    sample::write_sample_log(&path, count)?;

    info!("Generated {} log entries in {}", count, path.display());
    println!("✅ Generated {} log entries in {}", count, path.display());
    Ok(())
}

/// Initialize logging: console on stderr, plus an optional plain-text file.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if config.logging.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
    });

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let file_layer = match config.logging.file.as_deref().filter(|f| !f.is_empty()) {
        Some(log_path) => {
            let log_path = Path::new(log_path);
            if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory {}", parent.display())
                })?;
            }

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
                .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(())
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
fn run_analysis(args: &Args, config: &Config) -> Result<i32> {
    let start_time = Instant::now();
    let chatty = !args.quiet && !args.stdout;

    let parser = config.parser().context("Invalid [parser] pattern")?;
    if config.parser.pattern.is_some() {
        debug!("Using custom line grammar: {}", parser.pattern());
    }
    let dimensions = config.dimensions();
    for dimension in &dimensions {
        debug!("Tracking {} breakdown", dimension);
    }
    let analyzer =
        Pipeline::new(parser, config.report.top_count).with_dimensions(&dimensions);

    // Step 1: Open the log source
    let source_path = PathBuf::from(&config.input.log_file);
    if chatty {
        println!("📥 Reading log file: {}", source_path.display());
    }
    info!("Starting log analysis of {}", source_path.display());
    let lines = pipeline::open_source(&source_path)?;

    // Step 2: Parse and aggregate
    let show_progress = !args.quiet && std::io::stderr().is_terminal();
    let mut sink = TracingSink::new(show_progress);
    let outcome = analyzer.run(lines, &mut sink)?;
    sink.finish();

    // Step 3: Build and render the report
    let report = Report {
        metadata: ReportMetadata {
            source: source_path.display().to_string(),
            generated_at: Local::now(),
            top_n: config.report.top_count,
            stats: outcome.stats,
        },
        summary: outcome.summary,
    };

    let output = match config.report.format {
        OutputFormat::Text => report::render_at(&report.summary, &report.metadata.generated_at),
        OutputFormat::Json => report::generate_json_report(&report)?,
    };

    // Step 4: Deliver the report
    if args.stdout {
        println!("{}", output);
    } else {
        let output_path = PathBuf::from(&config.report.output);
        pipeline::write_report(&output_path, &output)?;
        info!("Summary report generated: {}", output_path.display());
    }

    let stats = report.metadata.stats;
    if chatty {
        println!("\n📊 Analysis Summary:");
        println!("   Lines read: {}", stats.lines_read);
        println!("   Total requests: {}", report.summary.total_requests);
        println!("   404 errors: {}", report.summary.not_found_count);
        println!("   Malformed lines skipped: {}", stats.malformed);
        println!("   Duration: {:.2}s", start_time.elapsed().as_secs_f64());
        if stats.records == 0 {
            println!("\n[INFO] No valid log entries found.");
        }
        println!("\n✅ Analysis complete! Report saved to: {}", config.report.output);
    }

    info!("Log analysis completed successfully.");

    let exit_code = args.exit_code(&stats);
    if exit_code == EXIT_MALFORMED {
        eprintln!(
            "\n⛔ {} malformed line(s) skipped. Failing (exit code {}).",
            stats.malformed, EXIT_MALFORMED
        );
    }

    Ok(exit_code)
}

/// Load configuration from file or use defaults.
///
/// Also returns the path the configuration was read from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => Ok((config, Some(PathBuf::from(DEFAULT_CONFIG_FILE)))),
        None => Ok((Config::default(), None)),
    }
}
