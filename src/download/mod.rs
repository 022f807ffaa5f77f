// src/download/mod.rs
// =============================================================================
// This module turns records that point at files into files on disk.
//
// Submodules:
// - naming: filesystem-safe names and deterministic destination paths
// - pipeline: fetching candidates and attaching the resolved path
// =============================================================================

mod naming;
mod pipeline;

pub use pipeline::{DownloadPipeline, Source};
