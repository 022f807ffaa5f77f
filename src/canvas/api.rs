// src/canvas/api.rs
// =============================================================================
// Canvas REST endpoints and the JSON shapes we read from them.
//
// We deliberately read responses as serde_json::Value and pull fields out by
// hand instead of deriving Deserialize. The API returns far more than we keep,
// and every missing or mistyped field we *do* need should produce an error
// that names the URL and the field, not a generic serde message.
// =============================================================================

use serde_json::{Map, Value};

use crate::error::{ArchiveError, Result};
use crate::records::{Assignment, CanvasFile, Course, ItemKind, LocalPath, Module, ModuleSubitem, Page};

/// Builds API URLs for one Canvas instance.
#[derive(Debug, Clone)]
pub struct CanvasApi {
    base: String,
}

impl CanvasApi {
    // Accepts a bare domain ("canvas.example.edu") or a full base URL
    // ("http://127.0.0.1:8080", used against local mock servers).
    pub fn new(domain: &str) -> Self {
        let domain = domain.trim_end_matches('/');
        let base = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        };
        Self { base }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn courses(&self) -> String {
        self.endpoint("/api/v1/courses")
    }

    pub fn course(&self, course_id: u64) -> String {
        self.endpoint(&format!("/api/v1/courses/{}", course_id))
    }

    pub fn modules(&self, course_id: u64) -> String {
        self.endpoint(&format!("/api/v1/courses/{}/modules", course_id))
    }
}

/// A module item after parsing: the record plus where to go next, if anywhere.
#[derive(Debug, Clone)]
pub struct ParsedItem {
    pub subitem: ModuleSubitem,
    /// Detail URL for File, Assignment and Page items
    pub detail_url: Option<String>,
}

pub fn expect_list<'a>(value: &'a Value, url: &str, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ArchiveError::format(url, format!("expected {} list, got {}", what, value)))
}

pub fn expect_object<'a>(value: &'a Value, url: &str, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ArchiveError::format(url, format!("expected {} object, got {}", what, value)))
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str, url: &str) -> Result<&'a Value> {
    obj.get(key)
        .ok_or_else(|| ArchiveError::format(url, format!("missing field {:?} in {}", key, Value::Object(obj.clone()))))
}

// Canvas ids are numbers, or numeric strings when the client asks for them
fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn required_id(obj: &Map<String, Value>, key: &str, url: &str) -> Result<u64> {
    let value = required(obj, key, url)?;
    as_id(value).ok_or_else(|| ArchiveError::format(url, format!("field {:?} is not an id: {}", key, value)))
}

fn required_u32(obj: &Map<String, Value>, key: &str, url: &str) -> Result<u32> {
    let value = required(obj, key, url)?;
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ArchiveError::format(url, format!("field {:?} is not a count: {}", key, value)))
}

fn required_str(obj: &Map<String, Value>, key: &str, url: &str) -> Result<String> {
    let value = required(obj, key, url)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ArchiveError::format(url, format!("field {:?} is not a string: {}", key, value)))
}

// Absent and null both read as None; any other non-string is an error
fn optional_str(obj: &Map<String, Value>, key: &str, url: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ArchiveError::format(url, format!("field {:?} is not a string: {}", key, other))),
    }
}

fn optional_id(obj: &Map<String, Value>, key: &str, url: &str) -> Result<Option<u64>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_id(value)
            .map(Some)
            .ok_or_else(|| ArchiveError::format(url, format!("field {:?} is not an id: {}", key, value))),
    }
}

pub fn parse_course(value: &Value, url: &str) -> Result<Course> {
    let obj = expect_object(value, url, "course")?;
    Ok(Course {
        id: required_id(obj, "id", url)?,
        name: required_str(obj, "name", url)?,
    })
}

pub fn parse_module(value: &Value, course_id: u64, url: &str) -> Result<Module> {
    let obj = expect_object(value, url, "module")?;

    // Locked modules would leave their content out of the archive, and we
    // don't know what an archive of them should look like.
    if let Some(unlock_at) = optional_str(obj, "unlock_at", url)? {
        return Err(ArchiveError::format(
            url,
            format!("unhandled unlock_at {:?} in {}", unlock_at, value),
        ));
    }

    Ok(Module {
        id: required_id(obj, "id", url)?,
        course_id,
        name: required_str(obj, "name", url)?,
        position: required_u32(obj, "position", url)?,
        items_count: required_u32(obj, "items_count", url)?,
        items_url: required_str(obj, "items_url", url)?,
    })
}

pub fn parse_module_item(value: &Value, module_id: u64, url: &str) -> Result<ParsedItem> {
    let obj = expect_object(value, url, "module item")?;

    let type_name = required_str(obj, "type", url)?;
    let kind = ItemKind::parse(&type_name).ok_or_else(|| {
        ArchiveError::format(url, format!("unexpected module item type {:?} in {}", type_name, value))
    })?;

    let content_id = if kind.carries_content_id() {
        Some(required_id(obj, "content_id", url)?)
    } else {
        None
    };

    let detail_url = match kind {
        ItemKind::File | ItemKind::Assignment | ItemKind::Page => Some(required_str(obj, "url", url)?),
        ItemKind::Discussion
        | ItemKind::Quiz
        | ItemKind::ExternalTool
        | ItemKind::SubHeader
        | ItemKind::ExternalUrl => None,
    };

    let subitem = ModuleSubitem {
        id: required_id(obj, "id", url)?,
        module_id,
        title: required_str(obj, "title", url)?,
        position: required_u32(obj, "position", url)?,
        indent: required_u32(obj, "indent", url)?,
        kind,
        content_id,
        external_url: optional_str(obj, "external_url", url)?,
    };

    Ok(ParsedItem { subitem, detail_url })
}

pub fn parse_file(value: &Value, course_id: u64, url: &str) -> Result<CanvasFile> {
    let obj = expect_object(value, url, "file")?;
    Ok(CanvasFile {
        id: required_id(obj, "id", url)?,
        course_id,
        // "filename" is the URL-encoded form; we keep the readable one
        filename: required_str(obj, "display_name", url)?,
        download_url: required_str(obj, "url", url)?,
        file_path: LocalPath::Unresolved,
    })
}

pub fn parse_assignment(value: &Value, url: &str) -> Result<Assignment> {
    let obj = expect_object(value, url, "assignment")?;

    let discussion_topic_id = match obj.get("discussion_topic") {
        None | Some(Value::Null) => None,
        Some(topic) => Some(required_id(expect_object(topic, url, "discussion topic")?, "id", url)?),
    };

    // Both keys must be present even when null
    required(obj, "description", url)?;
    required(obj, "due_at", url)?;

    Ok(Assignment {
        id: required_id(obj, "id", url)?,
        name: required_str(obj, "name", url)?,
        description: optional_str(obj, "description", url)?,
        due_at: optional_str(obj, "due_at", url)?,
        quiz_id: optional_id(obj, "quiz_id", url)?,
        discussion_topic_id,
    })
}

pub fn parse_page(value: &Value, url: &str) -> Result<Page> {
    let obj = expect_object(value, url, "page")?;
    Ok(Page {
        id: required_id(obj, "page_id", url)?,
        url: required_str(obj, "url", url)?,
        body: required_str(obj, "body", url)?,
    })
}
