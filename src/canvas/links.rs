// src/canvas/links.rs
// =============================================================================
// This module finds embedded file references in rich-text HTML.
//
// Assignment descriptions and page bodies link to course files with markup
// like:
//
//   <a class="instructure_file_link"
//      data-api-returntype="File"
//      data-api-endpoint="https://canvas.test/api/v1/courses/55/files/99">
//
// The endpoint attribute is already the file-detail API URL, so we can fetch
// the file record straight away instead of first resolving the link.
//
// We use the `scraper` crate to parse the fragment and select the markers.
// Anything that doesn't look exactly like the markup above is a format error:
// a marker we misread is a file that silently goes missing from the archive.
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

use crate::error::{ArchiveError, Result};

const FILE_LINK_SELECTOR: &str = ".instructure_file_link";

/// A validated embedded file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    /// Absolute file-detail API URL
    pub endpoint: String,
    /// Whatever follows `/files/` in the endpoint
    pub file_id: String,
}

// Extracts all embedded file references from an HTML fragment
//
// Parameters:
//   html: assignment description or page body
//   course_id: the course the fragment belongs to
//   source_url: the API URL the fragment came from (for relative endpoints
//               and error messages)
pub fn extract_file_links(html: &str, course_id: u64, source_url: &str) -> Result<Vec<FileLink>> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse(FILE_LINK_SELECTOR)
        .map_err(|e| ArchiveError::format(source_url, format!("bad selector: {:?}", e)))?;

    let files_segment = format!("/courses/{}/files/", course_id);
    let mut links = Vec::new();

    for element in fragment.select(&selector) {
        let attrs = element.value();

        let return_type = attrs.attr("data-api-returntype");
        if return_type != Some("File") {
            return Err(ArchiveError::format(
                source_url,
                format!(
                    "unexpected data-api-returntype {:?} on {}",
                    return_type,
                    element.html()
                ),
            ));
        }

        let endpoint = attrs.attr("data-api-endpoint").ok_or_else(|| {
            ArchiveError::format(
                source_url,
                format!("file link without data-api-endpoint: {}", element.html()),
            )
        })?;

        let parts: Vec<&str> = endpoint.split(files_segment.as_str()).collect();
        if parts.len() != 2 || parts[1].is_empty() {
            return Err(ArchiveError::format(
                source_url,
                format!("unexpected data-api-endpoint format: {:?}", endpoint),
            ));
        }

        links.push(FileLink {
            endpoint: resolve_endpoint(source_url, endpoint)?,
            file_id: parts[1].to_string(),
        });
    }

    Ok(links)
}

// Endpoints are normally absolute; relative ones are joined onto the URL of
// the response that contained them.
fn resolve_endpoint(source_url: &str, endpoint: &str) -> Result<String> {
    if let Ok(url) = Url::parse(endpoint) {
        return Ok(url.to_string());
    }
    Url::parse(source_url)
        .and_then(|base| base.join(endpoint))
        .map(|url| url.to_string())
        .map_err(|e| {
            ArchiveError::format(
                source_url,
                format!("cannot resolve data-api-endpoint {:?}: {}", endpoint, e),
            )
        })
}
