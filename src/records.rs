// src/records.rs
// =============================================================================
// The typed records produced by a crawl.
//
// Every record is created the moment its API response is parsed and never
// changes afterwards, with one exception: the download pipeline fills in the
// local path of CanvasFile and VideoSession records.
//
// Rust concepts:
// - Enums with data: Record is a closed set of kinds, so routing a record is
//   an exhaustive match instead of a runtime type check
// - Custom Serialize: LocalPath has three states but only two JSON shapes
// =============================================================================

use serde::{Serialize, Serializer};

/// Where a downloaded resource ended up on disk.
///
/// `Unresolved` means the record never went through the download pipeline and
/// is left out of the export. `Absent` means the pipeline ran and nothing was
/// stored; it is exported as `null` so the outcome is recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocalPath {
    #[default]
    Unresolved,
    Absent,
    Stored(String),
}

impl LocalPath {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, LocalPath::Unresolved)
    }

    pub fn stored(&self) -> Option<&str> {
        match self {
            LocalPath::Stored(path) => Some(path),
            _ => None,
        }
    }
}

impl Serialize for LocalPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LocalPath::Stored(path) => serializer.serialize_str(path),
            LocalPath::Unresolved | LocalPath::Absent => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    pub id: u64,
    pub course_id: u64,
    pub name: String,
    pub position: u32,
    pub items_count: u32,
    pub items_url: String,
}

/// The `type` of a module item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemKind {
    File,
    Discussion,
    Assignment,
    Quiz,
    ExternalTool,
    Page,
    SubHeader,
    ExternalUrl,
}

impl ItemKind {
    /// Parses the API's `type` string. Unknown kinds return None.
    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value {
            "File" => ItemKind::File,
            "Discussion" => ItemKind::Discussion,
            "Assignment" => ItemKind::Assignment,
            "Quiz" => ItemKind::Quiz,
            "ExternalTool" => ItemKind::ExternalTool,
            "Page" => ItemKind::Page,
            "SubHeader" => ItemKind::SubHeader,
            "ExternalUrl" => ItemKind::ExternalUrl,
            _ => return None,
        };
        Some(kind)
    }

    /// Kinds whose items point at a separate piece of content by id.
    pub fn carries_content_id(self) -> bool {
        matches!(
            self,
            ItemKind::File
                | ItemKind::Discussion
                | ItemKind::Assignment
                | ItemKind::Quiz
                | ItemKind::ExternalTool
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSubitem {
    pub id: u64,
    pub module_id: u64,
    pub title: String,
    pub position: u32,
    /// 0-based nesting level in the module listing
    pub indent: u32,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasFile {
    pub id: u64,
    pub course_id: u64,
    /// The human-readable display name, spaces and all
    pub filename: String,
    pub download_url: String,
    #[serde(skip_serializing_if = "LocalPath::is_unresolved")]
    pub file_path: LocalPath,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub due_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_topic_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub id: u64,
    pub url: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSession {
    pub id: String,
    pub course_id: u64,
    pub name: String,
    pub video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    /// Only usable with credentials, so it is dropped once its download is scheduled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_url: Option<String>,
    #[serde(skip_serializing_if = "LocalPath::is_unresolved")]
    pub subtitle_path: LocalPath,
}

/// One entry of the record stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    Course(Course),
    Module(Module),
    ModuleSubitem(ModuleSubitem),
    File(CanvasFile),
    Assignment(Assignment),
    Page(Page),
    VideoSession(VideoSession),
}

impl Record {
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Course(_) => "course",
            Record::Module(_) => "module",
            Record::ModuleSubitem(_) => "module_subitem",
            Record::File(_) => "file",
            Record::Assignment(_) => "assignment",
            Record::Page(_) => "page",
            Record::VideoSession(_) => "video_session",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file(path: LocalPath) -> Record {
        Record::File(CanvasFile {
            id: 99,
            course_id: 55,
            filename: "notes.pdf".to_string(),
            download_url: "https://canvas.test/files/99/download".to_string(),
            file_path: path,
        })
    }

    #[test]
    fn test_item_kind_parse() {
        assert_eq!(ItemKind::parse("SubHeader"), Some(ItemKind::SubHeader));
        assert_eq!(ItemKind::parse("ExternalUrl"), Some(ItemKind::ExternalUrl));
        assert_eq!(ItemKind::parse("Wiki"), None);
        assert_eq!(ItemKind::parse("file"), None);
    }

    #[test]
    fn test_content_id_kinds() {
        assert!(ItemKind::File.carries_content_id());
        assert!(ItemKind::ExternalTool.carries_content_id());
        assert!(!ItemKind::Page.carries_content_id());
        assert!(!ItemKind::SubHeader.carries_content_id());
        assert!(!ItemKind::ExternalUrl.carries_content_id());
    }

    #[test]
    fn test_unresolved_path_is_not_exported() {
        let value = serde_json::to_value(file(LocalPath::Unresolved)).unwrap();
        assert_eq!(value["record"], "file");
        assert!(value.get("file_path").is_none());
    }

    #[test]
    fn test_absent_path_is_exported_as_null() {
        let value = serde_json::to_value(file(LocalPath::Absent)).unwrap();
        assert_eq!(value.get("file_path"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_stored_path_is_exported_as_string() {
        let value = serde_json::to_value(file(LocalPath::Stored(
            "export-55/canvas-files/99_notes.pdf".to_string(),
        )))
        .unwrap();
        assert_eq!(value["file_path"], "export-55/canvas-files/99_notes.pdf");
    }

    #[test]
    fn test_subitem_serializes_kind_as_type() {
        let record = Record::ModuleSubitem(ModuleSubitem {
            id: 1,
            module_id: 2,
            title: "Week 1".to_string(),
            position: 1,
            indent: 0,
            kind: ItemKind::SubHeader,
            content_id: None,
            external_url: None,
        });
        let value = serde_json::to_value(record).unwrap();
        assert_eq!(
            value,
            json!({
                "record": "module_subitem",
                "id": 1,
                "module_id": 2,
                "title": "Week 1",
                "position": 1,
                "indent": 0,
                "type": "SubHeader",
            })
        );
    }
}
