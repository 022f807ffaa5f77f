// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, to stderr)
// 3. Validate the arguments into a run configuration
// 4. Run the archive job and print a summary
// 5. Exit with proper code (0 = archive complete, 2 = error)
//
// Records go to stdout (or --records), logs and the summary to stderr, so
// the JSON-lines output can be piped straight into another tool.
// =============================================================================

mod archive;
mod canvas;
mod cli;
mod config;
mod download;
mod error;
mod export;
mod fetch;
mod panopto;
mod records;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use cli::Cli;
use config::RunConfig;
use export::{ExportSummary, RecordWriter};
use fetch::HttpFetcher;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins; otherwise -q / -v / -vv pick the level
fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = RunConfig::try_from(cli.command)?;
    debug!(?config, "configuration loaded");

    let settings = config.archive();
    let fetcher = Arc::new(HttpFetcher::new(&settings.token, settings.request_timeout)?);
    let writer = RecordWriter::new(archive::open_sink(settings.records_path.as_deref())?);

    let summary = match &config {
        RunConfig::Canvas(canvas) => {
            info!(domain = %canvas.domain, "Archiving Canvas");
            let (stats, summary) = archive::run_canvas(canvas, fetcher, writer).await?;
            eprintln!(
                "🌐 {} API request(s), {} duplicate(s) skipped",
                stats.requests, stats.duplicate_requests
            );
            summary
        }
        RunConfig::Sessions(sessions) => {
            info!(manifest = %sessions.manifest.display(), "Archiving Panopto sessions");
            archive::run_sessions(sessions, fetcher, writer).await?
        }
    };

    print_summary(&summary);
    Ok(())
}

// Prints results as a human-readable table on stderr
fn print_summary(summary: &ExportSummary) {
    eprintln!("{:<20} {:>8}", "RECORD", "COUNT");
    eprintln!("{}", "=".repeat(29));
    for (kind, count) in &summary.by_kind {
        eprintln!("{:<20} {:>8}", kind, count);
    }
    eprintln!();

    eprintln!("📊 Summary:");
    eprintln!("   ✅ Downloaded: {}", summary.downloads_stored);
    eprintln!("   ❌ Not downloaded: {}", summary.downloads_missing);
    eprintln!("   📋 Records: {}", summary.total());
}
