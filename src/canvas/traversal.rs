// src/canvas/traversal.rs
// =============================================================================
// This module walks a Canvas course tree and turns it into a record stream.
//
// How it works:
// 1. Start with one task in a queue (the course list, or one course)
// 2. Fetch the task's URL through the per-origin gate
// 3. Hand the response to the task's handler, which returns records to emit
//    and follow-up tasks (modules, module items, file/assignment/page detail,
//    the next page of a listing)
// 4. Repeat until there is nothing queued and nothing in flight
//
// Each Task carries its own context (course id, module id, pagination chain),
// so a handler never needs shared state. Handlers are plain functions of
// (task, response), which keeps the whole tree walk testable without a
// network.
//
// Politeness:
// - Every fetch holds a permit from the OriginLimiter while in flight
// - The same URL is never fetched twice in one run. URLs are compared in
//   their parsed form, so `https://Canvas.test:443/x` and
//   `https://canvas.test/x` count as one
//
// Rust concepts:
// - FuturesUnordered: a set of in-flight futures polled together
// - mpsc channel: records flow to the download/export side as they appear
// - Arc<dyn Trait>: one fetcher shared by every in-flight request
// =============================================================================

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};
use url::Url;

use super::api::{self, CanvasApi};
use super::links::extract_file_links;
use super::pagination::PageChain;
use crate::error::{ArchiveError, Result};
use crate::fetch::{FetchResponse, Fetcher, OriginLimiter};
use crate::records::{Course, ItemKind, Record};

/// What to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlTarget {
    /// Every course visible to the token
    AllCourses,
    /// A single course by id
    Course(u64),
}

// One pending fetch and the context its handler needs
#[derive(Debug, Clone)]
enum Task {
    CourseList {
        url: String,
    },
    CourseDetail {
        url: String,
    },
    Modules {
        url: String,
        course_id: u64,
        chain: PageChain,
    },
    ModuleItems {
        url: String,
        course_id: u64,
        module_id: u64,
        chain: PageChain,
    },
    File {
        url: String,
        course_id: u64,
    },
    Assignment {
        url: String,
        course_id: u64,
    },
    Page {
        url: String,
        course_id: u64,
    },
}

impl Task {
    fn url(&self) -> &str {
        match self {
            Task::CourseList { url }
            | Task::CourseDetail { url }
            | Task::Modules { url, .. }
            | Task::ModuleItems { url, .. }
            | Task::File { url, .. }
            | Task::Assignment { url, .. }
            | Task::Page { url, .. } => url,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Task::CourseList { .. } => "course_list",
            Task::CourseDetail { .. } => "course",
            Task::Modules { .. } => "modules",
            Task::ModuleItems { .. } => "module_items",
            Task::File { .. } => "file",
            Task::Assignment { .. } => "assignment",
            Task::Page { .. } => "page",
        }
    }
}

// What handling one response produced
#[derive(Debug, Default)]
struct Step {
    records: Vec<Record>,
    tasks: Vec<Task>,
}

/// Counters for a finished crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub requests: usize,
    pub records: usize,
    pub duplicate_requests: usize,
}

/// Drives the walk over one Canvas instance.
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    limiter: Arc<OriginLimiter>,
    api: CanvasApi,
    max_pages: usize,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        limiter: Arc<OriginLimiter>,
        api: CanvasApi,
        max_pages: usize,
    ) -> Self {
        Self {
            fetcher,
            limiter,
            api,
            max_pages,
        }
    }

    // Crawls the target and sends every record into `records`.
    //
    // Returns once every scheduled fetch has been handled. The first error
    // stops the crawl; fetches still in flight are dropped.
    #[instrument(skip(self, records))]
    pub async fn run(&self, target: CrawlTarget, records: mpsc::Sender<Record>) -> Result<CrawlStats> {
        let first = match target {
            CrawlTarget::AllCourses => {
                info!("Crawling all courses");
                Task::CourseList {
                    url: self.api.courses(),
                }
            }
            CrawlTarget::Course(course_id) => {
                info!(course_id, "Crawling single course");
                Task::CourseDetail {
                    url: self.api.course(course_id),
                }
            }
        };

        let mut queue = VecDeque::from([first]);
        let mut requested = HashSet::new();
        let mut in_flight = FuturesUnordered::new();
        let mut stats = CrawlStats::default();

        loop {
            while let Some(task) = queue.pop_front() {
                // Same endpoint twice (e.g. one file embedded in two pages)
                if !requested.insert(request_key(task.url())) {
                    debug!(url = task.url(), kind = task.name(), "skipping duplicate request");
                    stats.duplicate_requests += 1;
                    continue;
                }
                in_flight.push(fetch_task(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.limiter),
                    task,
                ));
            }

            let Some(completed) = in_flight.next().await else {
                break;
            };
            let (task, response) = completed?;
            stats.requests += 1;

            let step = handle(&self.api, self.max_pages, task, &response)?;
            for record in step.records {
                records
                    .send(record)
                    .await
                    .map_err(|_| ArchiveError::ChannelClosed)?;
                stats.records += 1;
            }
            queue.extend(step.tasks);
        }

        info!(
            requests = stats.requests,
            records = stats.records,
            duplicates = stats.duplicate_requests,
            "Crawl finished"
        );
        Ok(stats)
    }
}

// Key for the dedup set: the URL as `url` serializes it (lowercase host, no
// default port, no fragment). Unparseable URLs are kept as they are and fail
// later at fetch time.
fn request_key(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.into()
        }
        Err(_) => raw.to_string(),
    }
}

// Fetches a task's URL while holding its origin's permit
async fn fetch_task(
    fetcher: Arc<dyn Fetcher>,
    limiter: Arc<OriginLimiter>,
    task: Task,
) -> Result<(Task, FetchResponse)> {
    let _permit = limiter.acquire(task.url()).await?;
    debug!(url = task.url(), kind = task.name(), "fetching");
    let response = fetcher.fetch(task.url()).await?;
    Ok((task, response))
}

// Turns one API response into records and follow-up tasks
fn handle(api: &CanvasApi, max_pages: usize, task: Task, response: &FetchResponse) -> Result<Step> {
    if !response.is_success() {
        return Err(ArchiveError::Status {
            url: response.url.clone(),
            status: response.status,
        });
    }
    let body = response.json()?;
    let url = response.url.as_str();
    let mut step = Step::default();

    match task {
        Task::CourseList { .. } => {
            for course in api::expect_list(&body, url, "courses")? {
                handle_course(api, max_pages, api::parse_course(course, url)?, &mut step);
            }
        }

        Task::CourseDetail { .. } => {
            handle_course(api, max_pages, api::parse_course(&body, url)?, &mut step);
        }

        Task::Modules { course_id, chain, .. } => {
            for module in api::expect_list(&body, url, "modules")? {
                let module = api::parse_module(module, course_id, url)?;
                step.tasks.push(Task::ModuleItems {
                    chain: PageChain::start(&module.items_url, max_pages),
                    url: module.items_url.clone(),
                    course_id,
                    module_id: module.id,
                });
                step.records.push(Record::Module(module));
            }

            if let Some((next, chain)) = chain.follow(url, response.next_page.as_deref())? {
                debug!(course_id, page = chain.pages(), next = %next, "following modules pagination");
                step.tasks.push(Task::Modules {
                    url: next,
                    course_id,
                    chain,
                });
            }
        }

        Task::ModuleItems {
            course_id,
            module_id,
            chain,
            ..
        } => {
            for item in api::expect_list(&body, url, "module items")? {
                let parsed = api::parse_module_item(item, module_id, url)?;
                if let Some(task) = parsed
                    .detail_url
                    .and_then(|detail_url| detail_task(parsed.subitem.kind, detail_url, course_id))
                {
                    step.tasks.push(task);
                }
                step.records.push(Record::ModuleSubitem(parsed.subitem));
            }

            if let Some((next, chain)) = chain.follow(url, response.next_page.as_deref())? {
                debug!(course_id, module_id, page = chain.pages(), next = %next, "following module items pagination");
                step.tasks.push(Task::ModuleItems {
                    url: next,
                    course_id,
                    module_id,
                    chain,
                });
            }
        }

        Task::File { course_id, .. } => {
            step.records
                .push(Record::File(api::parse_file(&body, course_id, url)?));
        }

        Task::Assignment { course_id, .. } => {
            let assignment = api::parse_assignment(&body, url)?;
            if let Some(description) = &assignment.description {
                push_embedded_files(description, course_id, url, &mut step)?;
            }
            step.records.push(Record::Assignment(assignment));
        }

        Task::Page { course_id, .. } => {
            let page = api::parse_page(&body, url)?;
            push_embedded_files(&page.body, course_id, url, &mut step)?;
            step.records.push(Record::Page(page));
        }
    }

    Ok(step)
}

fn handle_course(api: &CanvasApi, max_pages: usize, course: Course, step: &mut Step) {
    let modules_url = api.modules(course.id);
    step.tasks.push(Task::Modules {
        chain: PageChain::start(&modules_url, max_pages),
        url: modules_url,
        course_id: course.id,
    });
    step.records.push(Record::Course(course));
}

fn detail_task(kind: ItemKind, url: String, course_id: u64) -> Option<Task> {
    match kind {
        ItemKind::File => Some(Task::File { url, course_id }),
        ItemKind::Assignment => Some(Task::Assignment { url, course_id }),
        ItemKind::Page => Some(Task::Page { url, course_id }),
        ItemKind::Discussion
        | ItemKind::Quiz
        | ItemKind::ExternalTool
        | ItemKind::SubHeader
        | ItemKind::ExternalUrl => None,
    }
}

fn push_embedded_files(html: &str, course_id: u64, url: &str, step: &mut Step) -> Result<()> {
    for link in extract_file_links(html, course_id, url)? {
        debug!(course_id, file_id = %link.file_id, "found embedded file link");
        step.tasks.push(Task::File {
            url: link.endpoint,
            course_id,
        });
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why a queue plus FuturesUnordered instead of recursion?
//    - Recursive async functions need boxing and hide which fetch depends on
//      which
//    - Here the only dependencies are explicit: a follow-up task exists only
//      after its parent's response was handled
//
// 2. Why does pagination look sequential?
//    - The URL of page N+1 comes from page N's Link header, so it simply
//      cannot be requested earlier
//    - Sibling modules and items have no such dependency and may finish in
//      any order
//
// 3. Why is every error fatal?
//    - A skipped response is a hole in the archive nobody notices
//    - Stopping with the URL in the message is easier to act on
// -----------------------------------------------------------------------------
