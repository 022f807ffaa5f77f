// src/config.rs
// =============================================================================
// Run configuration.
//
// The CLI hands us raw values; this module checks them once, up front, so
// nothing touches the network with a blank token or a zero-sized limit.
// =============================================================================

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::canvas::CrawlTarget;
use crate::cli::{Commands, CommonArgs};

/// Settings every run needs.
#[derive(Clone)]
pub struct ArchiveConfig {
    pub token: String,
    pub output_dir: PathBuf,
    /// None means stdout
    pub records_path: Option<PathBuf>,
    pub download_concurrency: usize,
    /// Whole API request, or the gap between download chunks
    pub request_timeout: Duration,
}

// Hand-written so the token never ends up in logs
impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("token", &"<redacted>")
            .field("output_dir", &self.output_dir)
            .field("records_path", &self.records_path)
            .field("download_concurrency", &self.download_concurrency)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub domain: String,
    pub target: CrawlTarget,
    pub max_requests_per_origin: usize,
    pub max_pages: usize,
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone)]
pub struct SessionsConfig {
    pub course_id: u64,
    pub manifest: PathBuf,
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone)]
pub enum RunConfig {
    Canvas(CanvasConfig),
    Sessions(SessionsConfig),
}

impl RunConfig {
    pub fn archive(&self) -> &ArchiveConfig {
        match self {
            RunConfig::Canvas(config) => &config.archive,
            RunConfig::Sessions(config) => &config.archive,
        }
    }
}

impl TryFrom<Commands> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(command: Commands) -> Result<Self> {
        match command {
            Commands::Canvas {
                domain,
                course_id,
                max_requests_per_origin,
                max_pages,
                common,
            } => {
                let domain = domain.trim().to_string();
                if domain.is_empty() {
                    bail!("--domain must not be empty");
                }
                if max_requests_per_origin == 0 {
                    bail!("--max-requests-per-origin must be at least 1");
                }
                if max_pages == 0 {
                    bail!("--max-pages must be at least 1");
                }
                let target = match course_id {
                    Some(id) => CrawlTarget::Course(id),
                    None => CrawlTarget::AllCourses,
                };
                Ok(RunConfig::Canvas(CanvasConfig {
                    domain,
                    target,
                    max_requests_per_origin,
                    max_pages,
                    archive: archive_config(common)?,
                }))
            }
            Commands::Sessions {
                course_id,
                manifest,
                common,
            } => Ok(RunConfig::Sessions(SessionsConfig {
                course_id,
                manifest,
                archive: archive_config(common)?,
            })),
        }
    }
}

fn archive_config(common: CommonArgs) -> Result<ArchiveConfig> {
    let token = common.token.trim().to_string();
    if token.is_empty() {
        bail!("API token is empty (set --token or CANVAS_TOKEN)");
    }
    if common.download_concurrency == 0 {
        bail!("--download-concurrency must be at least 1");
    }
    if common.timeout_secs == 0 {
        bail!("--timeout-secs must be at least 1");
    }
    Ok(ArchiveConfig {
        token,
        output_dir: common.out,
        records_path: common.records,
        download_concurrency: common.download_concurrency,
        request_timeout: Duration::from_secs(common.timeout_secs),
    })
}
