// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things). Values are checked and
// turned into run configuration in config.rs.
// =============================================================================

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::canvas::DEFAULT_MAX_PAGES;

#[derive(Parser, Debug)]
#[command(
    name = "class-archiver",
    version,
    about = "Archive Canvas courses and Panopto subtitles to local files",
    long_about = "class-archiver walks a Canvas course (modules, items, pages, assignments and \
                  the files they embed), downloads every file into a stable directory layout and \
                  writes one JSON record per line describing what it found."
)]
pub struct Cli {
    /// More log output (-v = debug, -vv = trace). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl Canvas courses and download their files
    ///
    /// Example: class-archiver canvas --domain canvas.example.edu --course-id 1234
    Canvas {
        /// Canvas host (e.g. canvas.example.edu) or base URL
        #[arg(long)]
        domain: String,

        /// Only archive this course. Without it, every course the token can see is archived.
        #[arg(long)]
        course_id: Option<u64>,

        /// Maximum concurrent API requests per origin
        #[arg(long, default_value_t = 1)]
        max_requests_per_origin: usize,

        /// Give up on a listing that has more pages than this
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Download subtitles for Panopto sessions listed in a manifest
    ///
    /// Example: class-archiver sessions --course-id 1234 --manifest sessions.json
    Sessions {
        /// Canvas course the sessions belong to (used in the export path)
        #[arg(long)]
        course_id: u64,

        /// JSON array of sessions exported from Panopto
        #[arg(long)]
        manifest: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// API token, sent as a bearer token
    #[arg(long, env = "CANVAS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Directory the export-<course id>/ trees are created in
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Write JSON-lines records to this file instead of stdout
    #[arg(long)]
    pub records: Option<PathBuf>,

    /// Maximum concurrent file downloads
    #[arg(long, default_value_t = 8)]
    pub download_concurrency: usize,

    /// Seconds an API request may take, or a download may go without data
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,
}
