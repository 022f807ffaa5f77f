// src/fetch/store.rs
// =============================================================================
// Streaming a download to disk.
//
// Lecture recordings and slide decks can be large, and several downloads run
// at once, so a body is never held in memory whole. Chunks are written
// through a BufWriter as they arrive.
//
// There is no cap on how long a whole transfer may take. Instead every chunk
// must arrive within `idle`, so a slow but steady download finishes and a
// stalled one fails.
//
// If anything goes wrong after the file was created, the file is removed
// again. A record whose path is Absent never leaves half a file behind.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::warn;

use crate::error::{ArchiveError, Result};

/// Writes every chunk of `chunks` to `destination` and returns the byte count.
///
/// Parent directories are created as needed. On error the partially written
/// file is deleted.
pub async fn write_stream<S, B>(url: &str, chunks: S, destination: &Path, idle: Duration) -> Result<u64>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ArchiveError::io(parent, e))?;
    }
    let file = File::create(destination)
        .await
        .map_err(|e| ArchiveError::io(destination, e))?;

    match copy_chunks(url, chunks, file, destination, idle).await {
        Ok(written) => Ok(written),
        Err(e) => {
            if let Err(remove) = tokio::fs::remove_file(destination).await {
                warn!(path = %destination.display(), error = %remove, "could not remove partial download");
            }
            Err(e)
        }
    }
}

async fn copy_chunks<S, B>(url: &str, chunks: S, file: File, destination: &Path, idle: Duration) -> Result<u64>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut writer = BufWriter::new(file);
    let mut written: u64 = 0;

    loop {
        let next = tokio::time::timeout(idle, chunks.next())
            .await
            .map_err(|_| ArchiveError::Stalled {
                url: url.to_string(),
                idle,
            })?;
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk?;
        let bytes = chunk.as_ref();

        writer
            .write_all(bytes)
            .await
            .map_err(|e| ArchiveError::io(destination, e))?;
        written += bytes.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| ArchiveError::io(destination, e))?;
    Ok(written)
}
