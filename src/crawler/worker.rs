//! Per-task processing
//!
//! A worker receives one claimed (IN_PROGRESS) task and drives it to a
//! terminal state:
//! 1. Load the owning crawl request
//! 2. Tasks sitting at the depth bound complete immediately
//! 3. Resolve the page node; fetch and record its outlinks only if the page
//!    has never been crawled, otherwise reuse the stored edges
//! 4. Enqueue one child task per discovered link at the next level, flagging
//!    URLs this request has already queued as seen
//! 5. Mark the task COMPLETED
//!
//! Any error marks the task FAILED. Cancellation hands it back to the queue.

use crate::crawler::fetcher::fetch_page;
use crate::crawler::parser::extract_links;
use crate::state::TaskStatus;
use crate::storage::{lock, NewTask, Storage, TaskRecord};
use crate::{CrawlError, UrlError};
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

/// How a worker left its task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Task completed, having enqueued `children` child tasks
    Completed { children: usize },

    /// Task failed; the error has been logged
    Failed,

    /// Worker was cancelled and the task went back to NOT_STARTED
    Released,
}

/// Drives one claimed task to COMPLETED, FAILED, or back to NOT_STARTED
///
/// # Arguments
///
/// * `storage` - Shared storage backend
/// * `client` - HTTP client used for the page fetch
/// * `cancel` - Engine shutdown token
/// * `task` - A task already claimed by this engine
pub async fn process_task<S: Storage>(
    storage: &Mutex<S>,
    client: &Client,
    cancel: &CancellationToken,
    task: TaskRecord,
) -> TaskOutcome {
    match expand_task(storage, client, cancel, &task).await {
        Ok(children) => {
            let marked = lock(storage).set_task_status(task.id, TaskStatus::Completed);
            match marked {
                Ok(()) => {
                    tracing::debug!(
                        "Completed task {} ({}) with {} children",
                        task.id,
                        task.page_url,
                        children
                    );
                    TaskOutcome::Completed { children }
                }
                Err(e) => fail_task(storage, &task, &CrawlError::from(e)),
            }
        }
        Err(CrawlError::Cancelled) => release(storage, &task),
        Err(e) => fail_task(storage, &task, &e),
    }
}

async fn expand_task<S: Storage>(
    storage: &Mutex<S>,
    client: &Client,
    cancel: &CancellationToken,
    task: &TaskRecord,
) -> Result<usize, CrawlError> {
    let request = lock(storage).get_crawl_request(task.crawl_request_id)?;

    if task.current_level >= request.levels {
        return Ok(0);
    }

    if cancel.is_cancelled() {
        return Err(CrawlError::Cancelled);
    }

    let page = {
        let mut storage = lock(storage);
        let page_id = storage.upsert_page(&task.page_url)?;
        storage.get_page(page_id)?
    };

    let links = if page.crawled {
        let storage = lock(storage);
        let edges = storage.edges_from(page.id)?;
        edges
            .iter()
            .map(|edge| storage.get_page(edge.target_id).map(|target| target.url))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        let page_url =
            Url::parse(&page.url).map_err(|e| UrlError::Parse(format!("{}: {}", page.url, e)))?;

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
            body = fetch_page(client, &page.url) => body?,
        };

        let links = extract_links(&body, &page_url);
        lock(storage).record_outlinks(page.id, &links)?;
        links
    };

    if cancel.is_cancelled() {
        return Err(CrawlError::Cancelled);
    }

    let mut storage = lock(storage);
    let existing = storage.list_tasks(request.id)?;
    let children = plan_children(&existing, &links);
    storage.create_tasks(request.id, task.current_level + 1, &children)?;

    Ok(children.len())
}

/// Builds the child tasks for a page's links
///
/// A link is seen when this request already has a task for the URL, either
/// from before or from earlier in the same list.
pub(crate) fn plan_children(existing: &[TaskRecord], links: &[String]) -> Vec<NewTask> {
    let mut seen: HashSet<&str> = existing.iter().map(|t| t.page_url.as_str()).collect();

    links
        .iter()
        .map(|url| NewTask {
            url: url.clone(),
            seen: !seen.insert(url.as_str()),
        })
        .collect()
}

fn fail_task<S: Storage>(storage: &Mutex<S>, task: &TaskRecord, error: &CrawlError) -> TaskOutcome {
    tracing::error!(
        crawl_request = task.crawl_request_id,
        task = task.id,
        url = %task.page_url,
        level = task.current_level,
        "Task failed: {}",
        error
    );

    let marked = lock(storage).set_task_status(task.id, TaskStatus::Failed);
    if let Err(e) = marked {
        // Left IN_PROGRESS; stale-claim recovery will requeue it
        tracing::error!("Could not mark task {} as failed: {}", task.id, e);
    }
    TaskOutcome::Failed
}

fn release<S: Storage>(storage: &Mutex<S>, task: &TaskRecord) -> TaskOutcome {
    let released = lock(storage).release_task(task.id);
    match released {
        Ok(()) => tracing::info!("Released task {} ({}) on shutdown", task.id, task.page_url),
        Err(e) => tracing::warn!("Could not release task {}: {}", task.id, e),
    }
    TaskOutcome::Released
}
