// src/canvas/mod.rs
// =============================================================================
// This module walks the Canvas REST API.
//
// Submodules:
// - api: endpoint URLs and parsing JSON responses into records
// - links: embedded file references inside assignment/page HTML
// - pagination: following `rel="next"` continuations safely
// - traversal: the work-queue crawl that ties it all together
// =============================================================================

mod api;
mod links;
mod pagination;
mod traversal;

pub use api::CanvasApi;
pub use pagination::DEFAULT_MAX_PAGES;
pub use traversal::{CrawlStats, CrawlTarget, Crawler};
