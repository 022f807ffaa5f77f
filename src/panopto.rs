// src/panopto.rs
// =============================================================================
// Loading Panopto sessions from a manifest file.
//
// The video platform's session list is exported as a JSON array:
//
//   [{"id": "a1b2", "name": "Lecture 1",
//     "video_url": "https://.../a1b2.mp4", "srt_url": "https://.../caption"}]
//
// Each entry becomes a VideoSession record that the download pipeline picks
// up to fetch its subtitles.
// =============================================================================

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{ArchiveError, Result};
use crate::records::{LocalPath, VideoSession};

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    name: String,
    #[serde(alias = "ios_video_url")]
    video_url: String,
    #[serde(default, alias = "ios_video_path")]
    video_path: Option<String>,
    #[serde(default, alias = "subtitle_url")]
    srt_url: Option<String>,
}

// Parses manifest text into session records for `course_id`.
//
// `origin` names the manifest in error messages.
pub fn parse_sessions(json: &str, course_id: u64, origin: &str) -> Result<Vec<VideoSession>> {
    let entries: Vec<ManifestEntry> = serde_json::from_str(json)
        .map_err(|e| ArchiveError::format(origin, format!("invalid session manifest: {}", e)))?;

    Ok(entries
        .into_iter()
        .map(|entry| VideoSession {
            id: entry.id,
            course_id,
            name: entry.name,
            video_url: entry.video_url,
            video_path: entry.video_path,
            subtitle_url: entry.srt_url,
            subtitle_path: LocalPath::Unresolved,
        })
        .collect())
}

pub async fn read_sessions(path: &Path, course_id: u64) -> Result<Vec<VideoSession>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ArchiveError::io(path, e))?;
    let sessions = parse_sessions(&text, course_id, &path.display().to_string())?;
    info!(count = sessions.len(), path = %path.display(), "Loaded session manifest");
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sessions() {
        let json = r#"[
            {"id": "a1b2", "name": "Lecture 1", "video_url": "https://panopto.test/a1b2.mp4",
             "srt_url": "https://panopto.test/a1b2.srt"},
            {"id": "c3d4", "name": "Lecture 2", "ios_video_url": "https://panopto.test/c3d4.mp4",
             "ios_video_path": "videos/c3d4.mp4"}
        ]"#;
        let sessions = parse_sessions(json, 55, "sessions.json").unwrap();

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].course_id, 55);
        assert_eq!(sessions[0].subtitle_url.as_deref(), Some("https://panopto.test/a1b2.srt"));
        assert_eq!(sessions[1].video_url, "https://panopto.test/c3d4.mp4");
        assert_eq!(sessions[1].video_path.as_deref(), Some("videos/c3d4.mp4"));
        assert_eq!(sessions[1].subtitle_url, None);
        assert!(sessions[1].subtitle_path.is_unresolved());
    }

    #[test]
    fn test_manifest_must_be_a_list() {
        let err = parse_sessions(r#"{"id": "a"}"#, 55, "sessions.json").unwrap_err();
        assert!(matches!(err, ArchiveError::Format { .. }));
    }

    #[tokio::test]
    async fn test_read_missing_manifest() {
        let err = read_sessions(Path::new("/nonexistent/sessions.json"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Io { .. }));
    }
}
