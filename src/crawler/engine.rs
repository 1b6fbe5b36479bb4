//! Crawl engine - the scheduling loop
//!
//! The engine repeatedly claims tasks from the shared queue and hands each
//! one to a worker. Two scheduling modes are available:
//! - **Batch**: claim up to `max-workers` tasks, wait for the whole batch,
//!   repeat. A cycle that claims nothing sleeps for the poll interval.
//! - **Continuous**: keep up to `max-workers` workers running at all times,
//!   claiming a new task as soon as a slot frees up.
//!
//! Claim exclusivity comes from the storage layer, so any number of engines
//! (in one process or several) can share a database. On startup, claims
//! older than `stale-claim-after-secs` are returned to the queue.

use crate::config::{EngineConfig, SchedulingMode};
use crate::crawler::worker::{process_task, TaskOutcome};
use crate::storage::{lock, SharedStorage, Storage, TaskRecord};
use crate::CrawlError;
use chrono::Utc;
use reqwest::Client;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

static ENGINE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Counts of how claimed tasks ended during one engine run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub claimed: u64,
    pub completed: u64,
    pub failed: u64,
    pub released: u64,
    /// Workers that panicked; their tasks stay claimed until recovered
    pub crashed: u64,
}

impl RunSummary {
    fn record(&mut self, joined: Result<TaskOutcome, JoinError>) {
        match joined {
            Ok(TaskOutcome::Completed { .. }) => self.completed += 1,
            Ok(TaskOutcome::Failed) => self.failed += 1,
            Ok(TaskOutcome::Released) => self.released += 1,
            Err(e) => {
                tracing::error!("Worker crashed: {}", e);
                self.crashed += 1;
            }
        }
    }
}

/// Main crawl engine structure
pub struct Engine<S> {
    storage: SharedStorage<S>,
    client: Client,
    config: EngineConfig,
    instance_id: String,
}

impl<S> Engine<S>
where
    S: Storage + Send + 'static,
{
    /// Creates a new engine
    ///
    /// # Arguments
    ///
    /// * `storage` - Shared storage backend holding the task queue and page graph
    /// * `client` - HTTP client used by every worker
    /// * `config` - Engine configuration (worker count, polling, scheduling mode)
    pub fn new(storage: SharedStorage<S>, client: Client, config: EngineConfig) -> Self {
        let instance_id = format!(
            "engine-{}-{}-{}",
            std::process::id(),
            Utc::now().timestamp_millis(),
            ENGINE_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );

        Self {
            storage,
            client,
            config,
            instance_id,
        }
    }

    /// Identifier stamped on every task this engine claims
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Returns orphaned IN_PROGRESS tasks to the queue
    ///
    /// # Returns
    ///
    /// The number of tasks requeued
    pub fn recover_stale_claims(&self) -> Result<usize, CrawlError> {
        let stale_after = chrono::Duration::seconds(self.config.stale_claim_after_secs as i64);
        let cutoff = Utc::now() - stale_after;

        let requeued = lock(&self.storage).requeue_stale_tasks(cutoff)?;
        if requeued > 0 {
            tracing::warn!(
                "Requeued {} tasks whose claims were older than {:?}",
                requeued,
                self.config.stale_claim_after()
            );
        }
        Ok(requeued)
    }

    /// Runs the scheduling loop until `cancel` fires
    ///
    /// In-flight workers are drained before this returns; workers interrupted
    /// by the cancellation release their tasks.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary, CrawlError> {
        self.start(cancel, false).await
    }

    /// Runs the scheduling loop until the queue is drained
    ///
    /// Stops once no task can be claimed and no worker is in flight (or when
    /// `cancel` fires).
    pub async fn run_until_idle(&self, cancel: CancellationToken) -> Result<RunSummary, CrawlError> {
        self.start(cancel, true).await
    }

    async fn start(
        &self,
        cancel: CancellationToken,
        stop_when_idle: bool,
    ) -> Result<RunSummary, CrawlError> {
        self.recover_stale_claims()?;

        tracing::info!(
            "Engine {} started: {} workers, {:?} scheduling",
            self.instance_id,
            self.config.max_workers,
            self.config.scheduling
        );

        let summary = match self.config.scheduling {
            SchedulingMode::Batch => self.run_batches(&cancel, stop_when_idle).await,
            SchedulingMode::Continuous => self.run_continuous(&cancel, stop_when_idle).await,
        };

        tracing::info!(
            "Engine {} stopped: {} claimed, {} completed, {} failed, {} released",
            self.instance_id,
            summary.claimed,
            summary.completed,
            summary.failed,
            summary.released
        );
        Ok(summary)
    }

    async fn run_batches(&self, cancel: &CancellationToken, stop_when_idle: bool) -> RunSummary {
        let mut summary = RunSummary::default();

        while !cancel.is_cancelled() {
            let mut workers = JoinSet::new();
            for _ in 0..self.config.max_workers {
                if cancel.is_cancelled() {
                    break;
                }
                match self.claim() {
                    Some(task) => {
                        summary.claimed += 1;
                        workers.spawn(self.worker(task, cancel.clone()));
                    }
                    None => break,
                }
            }

            if workers.is_empty() {
                if stop_when_idle {
                    break;
                }
                self.idle(cancel).await;
                continue;
            }

            tracing::debug!("Cycle started with {} tasks", workers.len());
            while let Some(joined) = workers.join_next().await {
                summary.record(joined);
            }
        }

        summary
    }

    async fn run_continuous(&self, cancel: &CancellationToken, stop_when_idle: bool) -> RunSummary {
        let slots = Arc::new(Semaphore::new(self.config.max_workers as usize));
        let mut workers = JoinSet::new();
        let mut summary = RunSummary::default();

        loop {
            let permit = loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break None,
                    Some(joined) = workers.join_next(), if !workers.is_empty() => {
                        summary.record(joined);
                    }
                    permit = Arc::clone(&slots).acquire_owned() => break permit.ok(),
                }
            };
            let Some(permit) = permit else { break };

            match self.claim() {
                Some(task) => {
                    summary.claimed += 1;
                    let worker = self.worker(task, cancel.clone());
                    workers.spawn(async move {
                        let outcome = worker.await;
                        drop(permit);
                        outcome
                    });
                }
                None => {
                    drop(permit);
                    if workers.is_empty() {
                        if stop_when_idle {
                            break;
                        }
                        self.idle(cancel).await;
                    } else {
                        // Running workers may enqueue children; wait for one
                        // of them or for the poll interval
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = tokio::time::sleep(self.config.poll_interval()) => {}
                            Some(joined) = workers.join_next() => summary.record(joined),
                        }
                    }
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            summary.record(joined);
        }
        summary
    }

    /// Claims one task, treating storage errors as "nothing to claim"
    fn claim(&self) -> Option<TaskRecord> {
        let claimed = lock(&self.storage).claim_next_task(&self.instance_id);
        match claimed {
            Ok(task) => task,
            Err(e) => {
                tracing::error!("Failed to claim a task: {}", e);
                None
            }
        }
    }

    fn worker(
        &self,
        task: TaskRecord,
        cancel: CancellationToken,
    ) -> impl Future<Output = TaskOutcome> + Send + 'static {
        let storage = Arc::clone(&self.storage);
        let client = self.client.clone();
        async move { process_task(&storage, &client, &cancel, task).await }
    }

    async fn idle(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.config.poll_interval()) => {}
        }
    }
}
