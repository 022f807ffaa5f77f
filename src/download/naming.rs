// src/download/naming.rs
// =============================================================================
// Filesystem-safe names and deterministic destination paths.
//
// A path depends only on (course id, record id, name), so crawling the same
// course twice places every file at the same spot even though each run is a
// full re-walk.
// =============================================================================

use crate::error::{ArchiveError, Result};

// Replaced by PLACEHOLDER: path separators, wildcards, quote/pipe/angle
// brackets, '%', DEL and the C0 control characters.
const PLACEHOLDER: char = '-';

fn is_forbidden(c: char) -> bool {
    matches!(
        c,
        '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' | '\u{7f}' | '\u{0}'..='\u{1f}'
    )
}

/// Replaces characters illegal on common filesystems and strips trailing dots.
///
/// `record` only feeds the error message when nothing usable is left.
pub fn sanitize_filename(raw: &str, record: &str) -> Result<String> {
    let replaced: String = raw
        .chars()
        .map(|c| if is_forbidden(c) { PLACEHOLDER } else { c })
        .collect();
    let cleaned = replaced.trim_end_matches('.');

    if cleaned.is_empty() {
        return Err(ArchiveError::Naming {
            record: record.to_string(),
            raw: raw.to_string(),
        });
    }
    Ok(cleaned.to_string())
}

/// Where a downloaded resource belongs in the export tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    CanvasFiles,
    PanoptoSessions,
}

impl Category {
    fn dir(self) -> &'static str {
        match self {
            Category::CanvasFiles => "canvas-files",
            Category::PanoptoSessions => "panopto-sessions",
        }
    }

    fn extension(self) -> Option<&'static str> {
        match self {
            Category::CanvasFiles => None,
            Category::PanoptoSessions => Some("srt"),
        }
    }
}

/// Builds `export-{course_id}/{category}/{record_id}_{name}[.ext]`.
///
/// `record_id` and `name` must already be sanitized. The result is relative
/// to the output directory and always uses '/' so it is stable across
/// platforms.
pub fn destination_path(
    course_id: u64,
    record_id: &str,
    sanitized_name: &str,
    category: Category,
) -> String {
    let mut path = format!(
        "export-{}/{}/{}_{}",
        course_id,
        category.dir(),
        record_id,
        sanitized_name
    );
    if let Some(ext) = category.extension() {
        path.push('.');
        path.push_str(ext);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_forbidden_characters() {
        let cleaned = sanitize_filename("a/b\\c?d%e*f:g|h\"i<j>k", "file 1").unwrap();
        assert_eq!(cleaned, "a-b-c-d-e-f-g-h-i-j-k");
    }

    #[test]
    fn test_sanitize_replaces_control_characters() {
        let cleaned = sanitize_filename("tab\there\u{0}nul\u{7f}del\nline", "file 1").unwrap();
        assert_eq!(cleaned, "tab-here-nul-del-line");
    }

    #[test]
    fn test_sanitize_keeps_spaces_and_unicode() {
        let cleaned = sanitize_filename("Lecture 3 – Résumé.pdf", "file 1").unwrap();
        assert_eq!(cleaned, "Lecture 3 – Résumé.pdf");
    }

    #[test]
    fn test_sanitize_strips_trailing_dots() {
        assert_eq!(sanitize_filename("notes...", "file 1").unwrap(), "notes");
        assert_eq!(sanitize_filename(".hidden", "file 1").unwrap(), ".hidden");
    }

    #[test]
    fn test_sanitize_rejects_empty_result() {
        assert!(matches!(
            sanitize_filename("...", "file 7"),
            Err(ArchiveError::Naming { .. })
        ));
        assert!(sanitize_filename("", "file 7").is_err());
    }

    #[test]
    fn test_sanitize_placeholder_survives_dot_stripping() {
        // A forbidden character becomes '-', which is never stripped
        assert_eq!(sanitize_filename("/..", "file 1").unwrap(), "-");
    }

    #[test]
    fn test_sanitize_output_is_always_clean() {
        let inputs = [
            "plain",
            "with space.",
            "x\u{1}y\u{1f}z",
            "<<>>..",
            "ends with dot and slash/.",
            "emoji 📚.txt",
        ];
        for input in inputs {
            let cleaned = sanitize_filename(input, "file 1").unwrap();
            assert!(!cleaned.is_empty());
            assert!(!cleaned.ends_with('.'));
            assert!(!cleaned.chars().any(is_forbidden), "{cleaned:?}");
        }
    }

    #[test]
    fn test_canvas_file_path() {
        let path = destination_path(55, "99", "notes.pdf", Category::CanvasFiles);
        assert_eq!(path, "export-55/canvas-files/99_notes.pdf");
    }

    #[test]
    fn test_session_path_has_srt_extension() {
        let path = destination_path(55, "abc-123", "Lecture 1", Category::PanoptoSessions);
        assert_eq!(path, "export-55/panopto-sessions/abc-123_Lecture 1.srt");
    }

    #[test]
    fn test_destination_path_is_deterministic() {
        let first = destination_path(1, "2", "a", Category::CanvasFiles);
        let second = destination_path(1, "2", "a", Category::CanvasFiles);
        assert_eq!(first, second);
    }

    #[test]
    fn test_destination_path_differs_by_id_and_name() {
        let base = destination_path(1, "2", "a", Category::CanvasFiles);
        assert_ne!(base, destination_path(1, "3", "a", Category::CanvasFiles));
        assert_ne!(base, destination_path(1, "2", "b", Category::CanvasFiles));
        assert_ne!(base, destination_path(1, "2", "a", Category::PanoptoSessions));
    }
}
