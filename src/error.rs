// src/error.rs
// =============================================================================
// Error types for the archive engine.
//
// Every error here is fatal: the crawl has no partial-success mode. A
// structural surprise that got swallowed would leave a silently incomplete
// archive, so each variant carries enough context (URL, record id) to point
// at the offending response.
//
// The binary converts these into anyhow errors at the CLI boundary.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while walking the API or downloading files.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The API returned something whose shape we don't understand.
    #[error("unexpected response format from {url}: {detail}")]
    Format { url: String, detail: String },

    /// A pagination chain revisited a page or ran past the page cap.
    #[error("pagination error after {url}: {detail}")]
    Pagination { url: String, detail: String },

    /// A source name sanitized down to nothing.
    #[error("unusable name for record {record}: {raw:?} is empty after sanitizing")]
    Naming { record: String, raw: String },

    /// More than one download succeeded for a single record.
    #[error("expected at most 1 successful download for {record}, got {successes}: {details:?}")]
    Integrity {
        record: String,
        successes: usize,
        details: Vec<String>,
    },

    /// A record was routed to a pipeline that does not own its kind.
    #[error("{pipeline} pipeline received a {record} record")]
    TypeMismatch {
        pipeline: &'static str,
        record: &'static str,
    },

    /// Network-level failure on an API request.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// A download stopped sending data.
    #[error("no data from {url} for {idle:?}")]
    Stalled { url: String, idle: Duration },

    /// File system error while writing the archive.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be built.
    #[error("invalid HTTP client setup: {0}")]
    Setup(String),

    /// A per-origin request gate was closed while a fetch waited on it.
    #[error("request gate for {origin} closed")]
    GateClosed { origin: String },

    /// The record consumer stopped listening.
    #[error("record channel closed before the crawl finished")]
    ChannelClosed,
}

impl ArchiveError {
    pub fn format(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Format {
            url: url.into(),
            detail: detail.into(),
        }
    }

    pub fn pagination(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Pagination {
            url: url.into(),
            detail: detail.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_names_url() {
        let err = ArchiveError::format("https://canvas.test/api/v1/courses", "expected a list");
        let message = err.to_string();
        assert!(message.contains("https://canvas.test/api/v1/courses"));
        assert!(message.contains("expected a list"));
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = ArchiveError::TypeMismatch {
            pipeline: "canvas-files",
            record: "video_session",
        };
        assert_eq!(
            err.to_string(),
            "canvas-files pipeline received a video_session record"
        );
    }
}
