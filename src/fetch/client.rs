// src/fetch/client.rs
// =============================================================================
// The authenticated fetch capability.
//
// Everything that talks to the network goes through the Fetcher trait, so the
// crawl and the download pipeline can be driven by a scripted fetcher in
// tests and by reqwest in production.
//
// Pagination on the Canvas API is signaled out-of-band: the JSON body is just
// the page of results, and the next page lives in the `Link` header as
// `<https://...>; rel="next"`. HttpFetcher pulls that out so the rest of the
// crate never has to look at headers.
//
// API responses are small JSON pages and are read whole. File downloads go
// through download() instead, which streams the body to disk (store.rs).
//
// Rust concepts:
// - async-trait: async methods on a trait we can use as Arc<dyn Fetcher>
// - Option chaining: and_then() to walk through fallible header parsing
// =============================================================================

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, LINK};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::store::write_stream;
use crate::error::{ArchiveError, Result};

// How long establishing a connection may take
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL that was requested
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
    /// Target of the `rel="next"` Link header entry, if any
    pub next_page: Option<String>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON. A body that isn't JSON is a format violation.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ArchiveError::format(&self.url, format!("invalid JSON body: {}", e)))
    }
}

/// Anything that can GET a URL.
///
/// Implementations must not retry on their own behalf unless the caller asked
/// for it; a non-success status is returned as a normal response.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;

    /// Streams the body of `url` into `destination` and returns the number of
    /// bytes written.
    ///
    /// A non-success status is an error here and leaves nothing on disk.
    async fn download(&self, url: &str, destination: &Path) -> Result<u64>;
}

/// reqwest-backed fetcher that sends a bearer token on every request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    read_timeout: Duration,
}

impl HttpFetcher {
    // `read_timeout` bounds a whole API request, and the wait for each chunk
    // of a download
    pub fn new(token: &str, read_timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ArchiveError::Setup(format!("token is not a valid header value: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        // Follows redirects, which file downloads rely on to reach their
        // storage hosts.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ArchiveError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            read_timeout,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .timeout(self.read_timeout)
            .send()
            .await
            .map_err(|source| ArchiveError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let next_page = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_next_link);

        let body = response
            .bytes()
            .await
            .map_err(|source| ArchiveError::Http {
                url: url.to_string(),
                source,
            })?
            .to_vec();

        Ok(FetchResponse {
            url: url.to_string(),
            status,
            body,
            next_page,
        })
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        debug!(url, path = %destination.display(), "GET (download)");
        let response = tokio::time::timeout(self.read_timeout, self.client.get(url).send())
            .await
            .map_err(|_| ArchiveError::Stalled {
                url: url.to_string(),
                idle: self.read_timeout,
            })?
            .map_err(|source| ArchiveError::Http {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ArchiveError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let owned_url = url.to_string();
        let chunks = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|source| ArchiveError::Http {
                url: owned_url.clone(),
                source,
            })
        });
        write_stream(url, chunks, destination, self.read_timeout).await
    }
}

// Finds the `rel="next"` target in a Link header.
//
// Example:
//   <https://x/api/v1/courses?page=1>; rel="current",
//   <https://x/api/v1/courses?page=2>; rel="next"
//   -> Some("https://x/api/v1/courses?page=2")
pub fn parse_next_link(header: &str) -> Option<String> {
    for entry in header.split(',') {
        let mut parts = entry.split(';');
        let target = parts.next().unwrap_or("").trim();
        let Some(target) = target.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
            continue;
        };

        let is_next = parts.any(|param| {
            let param = param.trim();
            match param.split_once('=') {
                Some((name, value)) if name.trim().eq_ignore_ascii_case("rel") => value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|rel| rel.eq_ignore_ascii_case("next")),
                _ => false,
            }
        });

        if is_next {
            return Some(target.to_string());
        }
    }
    None
}
