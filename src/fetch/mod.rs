// src/fetch/mod.rs
// =============================================================================
// Network access for the rest of the crate.
//
// Submodules:
// - client: the Fetcher trait and its reqwest implementation
// - limiter: per-origin semaphores that serialize API requests
// - store: streaming a download body to disk
// =============================================================================

mod client;
mod limiter;
mod store;

pub use client::{FetchResponse, Fetcher, HttpFetcher};
pub use limiter::OriginLimiter;
pub use store::write_stream;
