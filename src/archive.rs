// src/archive.rs
// =============================================================================
// Running a whole archive job.
//
// Two halves run side by side:
// - the producer: the Canvas crawl (or a session manifest) emitting records
// - the consumer: the download pipeline plus the export sink
//
// They're joined with try_join!, so the first fatal error on either side
// drops the other and the run ends without reporting completion.
// Downloads run with buffer_unordered and are not bound by the API's
// per-origin limit.
// =============================================================================

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::canvas::{CanvasApi, CrawlStats, Crawler};
use crate::config::{CanvasConfig, SessionsConfig};
use crate::download::{DownloadPipeline, Source};
use crate::export::{ExportSummary, RecordWriter};
use crate::fetch::{Fetcher, OriginLimiter};
use crate::panopto;
use crate::records::Record;

// Records buffered between the crawl and the downloads
const RECORD_BUFFER: usize = 256;

/// Opens the JSON-lines sink: a file if one was given, stdout otherwise.
pub fn open_sink(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

pub async fn run_canvas<W: Write>(
    config: &CanvasConfig,
    fetcher: Arc<dyn Fetcher>,
    writer: RecordWriter<W>,
) -> Result<(CrawlStats, ExportSummary)> {
    let crawler = Crawler::new(
        Arc::clone(&fetcher),
        Arc::new(OriginLimiter::new(config.max_requests_per_origin)),
        CanvasApi::new(&config.domain),
        config.max_pages,
    );
    let pipeline = DownloadPipeline::new(fetcher, &config.archive.output_dir, Source::Canvas);

    let (tx, rx) = mpsc::channel(RECORD_BUFFER);
    let crawl = async {
        crawler
            .run(config.target, tx)
            .await
            .context("crawl aborted")
    };
    let export = export_records(
        ReceiverStream::new(rx),
        &pipeline,
        config.archive.download_concurrency,
        writer,
    );

    let (stats, summary) = tokio::try_join!(crawl, export)?;
    info!(records = summary.total(), "Canvas archive complete");
    Ok((stats, summary))
}

pub async fn run_sessions<W: Write>(
    config: &SessionsConfig,
    fetcher: Arc<dyn Fetcher>,
    writer: RecordWriter<W>,
) -> Result<ExportSummary> {
    let sessions = panopto::read_sessions(&config.manifest, config.course_id).await?;
    let pipeline = DownloadPipeline::new(fetcher, &config.archive.output_dir, Source::Panopto);

    let records = stream::iter(sessions.into_iter().map(Record::VideoSession));
    let summary = export_records(records, &pipeline, config.archive.download_concurrency, writer).await?;
    info!(records = summary.total(), "Session archive complete");
    Ok(summary)
}

// Routes every record through the pipeline and writes it out
async fn export_records<S, W>(
    records: S,
    pipeline: &DownloadPipeline,
    concurrency: usize,
    mut writer: RecordWriter<W>,
) -> Result<ExportSummary>
where
    S: Stream<Item = Record>,
    W: Write,
{
    let processed = records
        .map(|record| pipeline.process(record))
        .buffer_unordered(concurrency);
    let mut processed = std::pin::pin!(processed);

    while let Some(result) = processed.next().await {
        let record = result.context("download pipeline aborted")?;
        writer.write(&record)?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CrawlTarget, DEFAULT_MAX_PAGES};
    use crate::config::ArchiveConfig;
    use crate::test_support::ScriptedFetcher;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn archive_config(dir: &Path) -> ArchiveConfig {
        ArchiveConfig {
            token: "t".to_string(),
            output_dir: dir.to_path_buf(),
            records_path: None,
            download_concurrency: 4,
            request_timeout: Duration::from_secs(5),
        }
    }

    fn lines(buffer: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8(buffer.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_course_with_file_end_to_end() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let api = "https://canvas.test/api/v1/courses/5";
        fetcher.json(api, json!({"id": 5, "name": "Systems"}));
        fetcher.json(
            &format!("{}/modules", api),
            json!([{"id": 10, "name": "Week 1", "position": 1, "items_count": 1,
                    "items_url": format!("{}/modules/10/items", api), "unlock_at": null}]),
        );
        fetcher.json(
            &format!("{}/modules/10/items", api),
            json!([{"id": 100, "title": "Syllabus", "position": 1, "indent": 0, "type": "File",
                    "content_id": 99, "url": format!("{}/files/99", api)}]),
        );
        fetcher.json(
            &format!("{}/files/99", api),
            json!({"id": 99, "display_name": "syllabus.pdf", "url": "https://files.canvas.test/99"}),
        );
        fetcher.bytes("https://files.canvas.test/99", b"syllabus");

        let config = CanvasConfig {
            domain: "canvas.test".to_string(),
            target: CrawlTarget::Course(5),
            max_requests_per_origin: 1,
            max_pages: DEFAULT_MAX_PAGES,
            archive: archive_config(dir.path()),
        };

        let mut buffer = Vec::new();
        let (stats, summary) = run_canvas(&config, fetcher, RecordWriter::new(&mut buffer))
            .await
            .unwrap();

        assert_eq!(stats.requests, 4);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.downloads_stored, 1);

        let records = lines(&buffer);
        let file = records.iter().find(|r| r["record"] == "file").unwrap();
        assert_eq!(file["file_path"], "export-5/canvas-files/99_syllabus.pdf");
        let stored = std::fs::read(dir.path().join("export-5/canvas-files/99_syllabus.pdf")).unwrap();
        assert_eq!(stored, b"syllabus");
    }

    #[tokio::test]
    async fn test_crawl_error_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.json("https://canvas.test/api/v1/courses", json!({"unexpected": true}));

        let config = CanvasConfig {
            domain: "canvas.test".to_string(),
            target: CrawlTarget::AllCourses,
            max_requests_per_origin: 1,
            max_pages: DEFAULT_MAX_PAGES,
            archive: archive_config(dir.path()),
        };

        let result = run_canvas(&config, fetcher, RecordWriter::new(Vec::new())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sessions_manifest_end_to_end() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("sessions.json");
        std::fs::write(
            &manifest,
            r#"[{"id": "a1", "name": "Lecture: 1", "video_url": "https://panopto.test/a1.mp4",
                 "srt_url": "https://panopto.test/a1.srt"},
                {"id": "b2", "name": "Lecture 2", "video_url": "https://panopto.test/b2.mp4"}]"#,
        )
        .unwrap();

        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.bytes("https://panopto.test/a1.srt", b"1\n");

        let config = SessionsConfig {
            course_id: 55,
            manifest: PathBuf::from(&manifest),
            archive: archive_config(dir.path()),
        };

        let mut buffer = Vec::new();
        let summary = run_sessions(&config, fetcher, RecordWriter::new(&mut buffer))
            .await
            .unwrap();

        assert_eq!(summary.downloads_stored, 1);
        assert_eq!(summary.downloads_missing, 1);

        let records = lines(&buffer);
        let first = records.iter().find(|r| r["id"] == "a1").unwrap();
        assert_eq!(first["subtitle_path"], "export-55/panopto-sessions/a1_Lecture- 1.srt");
        assert!(first.get("subtitle_url").is_none());
        let second = records.iter().find(|r| r["id"] == "b2").unwrap();
        assert_eq!(second["subtitle_path"], serde_json::Value::Null);
    }
}
