// src/export.rs
// =============================================================================
// The record export sink.
//
// Finished records are written as JSON lines: one object per line, tagged
// with its kind, e.g.
//
//   {"record":"file","id":99,"course_id":55,"filename":"a.pdf",...}
//
// The writer also keeps per-kind counts for the summary printed at the end.
// =============================================================================

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};

use crate::records::Record;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Records written, by kind
    pub by_kind: BTreeMap<&'static str, usize>,
    /// Files and subtitles that made it to disk
    pub downloads_stored: usize,
    /// Files and subtitles whose download didn't succeed
    pub downloads_missing: usize,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.by_kind.values().sum()
    }
}

pub struct RecordWriter<W: Write> {
    out: W,
    summary: ExportSummary,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            summary: ExportSummary::default(),
        }
    }

    pub fn write(&mut self, record: &Record) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)
            .with_context(|| format!("failed to serialize {} record", record.kind()))?;
        self.out.write_all(b"\n").context("failed to write record")?;

        *self.summary.by_kind.entry(record.kind()).or_insert(0) += 1;
        let download = match record {
            Record::File(file) => Some(&file.file_path),
            Record::VideoSession(session) => Some(&session.subtitle_path),
            _ => None,
        };
        if let Some(path) = download {
            if path.stored().is_some() {
                self.summary.downloads_stored += 1;
            } else if !path.is_unresolved() {
                self.summary.downloads_missing += 1;
            }
        }
        Ok(())
    }

    /// Flushes the sink and hands back the counts.
    pub fn finish(mut self) -> Result<ExportSummary> {
        self.out.flush().context("failed to flush record export")?;
        Ok(self.summary)
    }
}
