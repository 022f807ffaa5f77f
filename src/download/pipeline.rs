// src/download/pipeline.rs
// =============================================================================
// This module downloads the files that records point at.
//
// Two record kinds carry download candidates:
// - CanvasFile: its download_url
// - VideoSession: its subtitle_url (if the session has subtitles)
//
// For each such record we:
// 1. Work out the destination path up front (naming.rs)
// 2. Stream every candidate URL to that path (fetch/store.rs)
// 3. Collapse the outcomes into the record's path: none stored -> Absent,
//    one stored -> Stored(path), more than one -> fatal
//
// A failed download (404, stall, write error) is a normal outcome and just
// leaves the path Absent; the fetcher has already removed any partial file.
// Two successes for one record means our "one record, one physical file"
// assumption is broken, and picking one would hide that.
//
// Rust concepts:
// - join_all: run all candidate fetches of a record concurrently
// - Exhaustive match: every Record variant is routed explicitly
// =============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::naming::{destination_path, sanitize_filename, Category};
use crate::error::{ArchiveError, Result};
use crate::fetch::Fetcher;
use crate::records::{CanvasFile, LocalPath, Record, VideoSession};

/// Which crawl the records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Canvas,
    Panopto,
}

impl Source {
    fn pipeline_name(self) -> &'static str {
        match self {
            Source::Canvas => "canvas-files",
            Source::Panopto => "panopto-sessions",
        }
    }
}

/// Result of one candidate fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Written to this path, relative to the output directory
    Stored(String),
    /// Why it didn't work
    Failed(String),
}

pub struct DownloadPipeline {
    fetcher: Arc<dyn Fetcher>,
    output_dir: PathBuf,
    source: Source,
}

impl DownloadPipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, output_dir: impl Into<PathBuf>, source: Source) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
            source,
        }
    }

    // Downloads whatever the record points at and returns it with its path
    // attached. Records without download candidates pass through untouched.
    pub async fn process(&self, record: Record) -> Result<Record> {
        match record {
            Record::File(file) => {
                self.expect_source(Source::Canvas, "file")?;
                Ok(Record::File(self.download_file(file).await?))
            }
            Record::VideoSession(session) => {
                self.expect_source(Source::Panopto, "video_session")?;
                Ok(Record::VideoSession(self.download_subtitles(session).await?))
            }
            other @ (Record::Course(_)
            | Record::Module(_)
            | Record::ModuleSubitem(_)
            | Record::Assignment(_)
            | Record::Page(_)) => Ok(other),
        }
    }

    fn expect_source(&self, owner: Source, record: &'static str) -> Result<()> {
        if self.source != owner {
            return Err(ArchiveError::TypeMismatch {
                pipeline: self.source.pipeline_name(),
                record,
            });
        }
        Ok(())
    }

    async fn download_file(&self, mut file: CanvasFile) -> Result<CanvasFile> {
        let label = format!("file {}", file.id);
        let name = sanitize_filename(&file.filename, &label)?;
        let relative = destination_path(file.course_id, &file.id.to_string(), &name, Category::CanvasFiles);

        file.file_path = self
            .download_candidates(&label, vec![file.download_url.clone()], &relative)
            .await?;
        Ok(file)
    }

    async fn download_subtitles(&self, mut session: VideoSession) -> Result<VideoSession> {
        let label = format!("session {}", session.id);
        // Session ids are opaque strings from the manifest, so they go
        // through the same sanitizer as names
        let id = sanitize_filename(&session.id, &label)?;
        let name = sanitize_filename(&session.name, &label)?;
        let relative = destination_path(session.course_id, &id, &name, Category::PanoptoSessions);

        // The subtitle URL needs credentials, so it's worthless in the archive
        let candidates: Vec<String> = session.subtitle_url.take().into_iter().collect();
        session.subtitle_path = self.download_candidates(&label, candidates, &relative).await?;
        Ok(session)
    }

    async fn download_candidates(&self, label: &str, candidates: Vec<String>, relative: &str) -> Result<LocalPath> {
        debug!(record = label, candidates = candidates.len(), path = relative, "downloading");
        let outcomes = join_all(candidates.iter().map(|url| self.fetch_to(url, relative))).await;
        resolve_outcomes(label, outcomes)
    }

    async fn fetch_to(&self, url: &str, relative: &str) -> DownloadOutcome {
        let destination = self.output_dir.join(relative);
        match self.fetcher.download(url, &destination).await {
            Ok(bytes) => {
                info!(path = relative, bytes, "stored");
                DownloadOutcome::Stored(relative.to_string())
            }
            Err(e) => {
                warn!(url, error = %e, "download failed");
                DownloadOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Collapses candidate outcomes into the record's path.
pub fn resolve_outcomes(label: &str, outcomes: Vec<DownloadOutcome>) -> Result<LocalPath> {
    let details: Vec<String> = outcomes.iter().map(|o| format!("{:?}", o)).collect();
    let mut stored: Vec<String> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            DownloadOutcome::Stored(path) => Some(path),
            DownloadOutcome::Failed(_) => None,
        })
        .collect();

    match stored.len() {
        0 => Ok(LocalPath::Absent),
        1 => Ok(LocalPath::Stored(stored.remove(0))),
        successes => Err(ArchiveError::Integrity {
            record: label.to_string(),
            successes,
            details,
        }),
    }
}
