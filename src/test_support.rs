// src/test_support.rs
// =============================================================================
// A Fetcher that answers from a script instead of the network.
//
// Responses are registered per URL; anything unregistered comes back as a
// 404. Every request is logged in order so tests can assert on what was
// fetched and when. Downloads share the same script and are written to disk
// through the real streaming writer.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;

use crate::error::{ArchiveError, Result};
use crate::fetch::{write_stream, FetchResponse, Fetcher};

#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, FetchResponse>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn respond(&self, url: &str, status: u16, body: Vec<u8>, next_page: Option<&str>) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            FetchResponse {
                url: url.to_string(),
                status,
                body,
                next_page: next_page.map(str::to_string),
            },
        );
    }

    pub fn json(&self, url: &str, value: Value) {
        self.json_with_next(url, value, None);
    }

    pub fn json_with_next(&self, url: &str, value: Value, next_page: Option<&str>) {
        self.respond(url, 200, value.to_string().into_bytes(), next_page);
    }

    pub fn bytes(&self, url: &str, body: &[u8]) {
        self.respond(url, 200, body.to_vec(), None);
    }

    pub fn status(&self, url: &str, status: u16) {
        self.respond(url, status, Vec::new(), None);
    }

    /// URLs fetched so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        let scripted = self.responses.lock().unwrap().get(url).cloned();
        Ok(scripted.unwrap_or_else(|| FetchResponse {
            url: url.to_string(),
            status: 404,
            body: Vec::new(),
            next_page: None,
        }))
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let response = self.fetch(url).await?;
        if !response.is_success() {
            return Err(ArchiveError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        let chunks = stream::iter([Ok::<_, ArchiveError>(response.body)]);
        write_stream(url, chunks, destination, Duration::from_secs(5)).await
    }
}
