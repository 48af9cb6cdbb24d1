// src/pool/mod.rs
// =============================================================================
// The download pool: runs one batch of items with a fixed number of
// concurrent workers.
//
// Submodules:
// - task: a single download (fetch, stream to disk, rename into place)
// - report: per-task outcomes and the batch report
//
// How it works:
// 1. Make sure the output directory exists
// 2. Put every item on a shared FIFO queue as a DownloadTask
// 3. Spawn `workers` tokio tasks; each pops the next task off the queue,
//    runs it, and goes back for more until the queue is empty
// 4. Wait for every worker and collect one TaskReport per item
//
// Tasks start in submission order, at most `workers` are in flight, and
// they finish in whatever order the network allows.
//
// A failed task never takes the batch down with it. With
// FailurePolicy::Abort the workers stop starting new tasks after the first
// failure, and the ones left on the queue are reported as skipped.
//
// Rust concepts:
// - tokio::spawn: each worker is its own task on the multi-threaded runtime
// - Arc: the queue and counters are shared by all workers
// - Atomics: counters updated by several workers at once
// =============================================================================

mod report;
mod task;

pub use report::{BatchReport, TaskOutcome, TaskReport, TaskState};
use task::DownloadTask;

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::config::FailurePolicy;
use crate::error::{log_error, summary, SetupError};
use crate::fetch::Fetcher;
use crate::page::ItemDescriptor;

// Tracks how many tasks are in flight and the highest value seen
#[derive(Debug, Default)]
struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Created once per run, consumed by `run`.
pub struct DownloadPool {
    fetcher: Fetcher,
    workers: usize,
    policy: FailurePolicy,
    debug: bool,
}

// State every worker sees
struct Shared {
    fetcher: Fetcher,
    policy: FailurePolicy,
    debug: bool,
    queue: Mutex<VecDeque<DownloadTask>>,
    aborted: AtomicBool,
    gauge: InFlightGauge,
}

impl DownloadPool {
    pub fn new(fetcher: Fetcher, workers: usize, policy: FailurePolicy) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            policy,
            debug: false,
        }
    }

    /// Log full error chains for failed tasks.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    // Downloads every item into output_dir and waits for all of them.
    //
    // Returns Err only when the output directory cannot be prepared; per-item
    // failures are in the report.
    pub async fn run(
        self,
        items: Vec<ItemDescriptor>,
        output_dir: &Path,
    ) -> Result<BatchReport, SetupError> {
        ensure_output_dir(output_dir).await?;

        if items.is_empty() {
            info!("no items to download");
            return Ok(BatchReport::default());
        }

        let total = items.len();
        let worker_count = self.workers.min(total);
        info!(
            "downloading {} item(s) with {} worker(s)",
            total, worker_count
        );

        let queue: VecDeque<DownloadTask> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| DownloadTask::new(index, item, output_dir.to_path_buf()))
            .collect();

        for task in &queue {
            debug!(index = task.index, "{}: {}", task.item.title, TaskState::Queued);
        }

        let shared = Arc::new(Shared {
            fetcher: self.fetcher,
            policy: self.policy,
            debug: self.debug,
            queue: Mutex::new(queue),
            aborted: AtomicBool::new(false),
            gauge: InFlightGauge::default(),
        });

        let handles: Vec<_> = (0..worker_count)
            .map(|worker| {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move { shared.work(worker).await })
            })
            .collect();

        let mut reports = Vec::with_capacity(total);
        for handle in handles {
            match handle.await {
                Ok(done) => reports.extend(done),
                Err(e) => error!("download worker stopped: {}", e),
            }
        }

        // Only a crashed worker can leave tasks behind
        while let Some(task) = shared.next() {
            reports.push(into_report(task, TaskOutcome::Skipped));
        }

        let report = BatchReport::new(reports, shared.gauge.peak());
        info!(
            "batch finished: {} completed, {} failed, {} skipped",
            report.completed(),
            report.failed(),
            report.skipped()
        );

        Ok(report)
    }
}

impl Shared {
    fn next(&self) -> Option<DownloadTask> {
        self.queue.lock().ok()?.pop_front()
    }

    async fn work(self: Arc<Self>, worker: usize) -> Vec<TaskReport> {
        let mut done = Vec::new();
        while let Some(task) = self.next() {
            done.push(self.run_task(worker, task).await);
        }
        debug!(worker, "queue drained, worker exiting");
        done
    }

    async fn run_task(&self, worker: usize, task: DownloadTask) -> TaskReport {
        if self.policy == FailurePolicy::Abort && self.aborted.load(Ordering::SeqCst) {
            warn!("skipping '{}' after an earlier failure", task.item.title);
            return into_report(task, TaskOutcome::Skipped);
        }

        self.gauge.enter();
        debug!(worker, index = task.index, "{}: {}", task.item.title, TaskState::InFlight);

        let outcome = match task.run(&self.fetcher).await {
            Ok(stored) => {
                info!(
                    "stored file {} to {} ({} bytes)",
                    task.file_name(),
                    stored
                        .path
                        .parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    stored.bytes
                );
                TaskOutcome::Completed {
                    path: stored.path,
                    bytes: stored.bytes,
                    status: stored.status,
                }
            }
            Err(err) => {
                log_error(&format!("download '{}'", task.item.title), &err, self.debug);
                self.aborted.store(true, Ordering::SeqCst);
                TaskOutcome::Failed {
                    error: summary(&err),
                }
            }
        };

        self.gauge.leave();
        debug!(worker, index = task.index, "{}: {}", task.item.title, outcome.state());
        into_report(task, outcome)
    }
}

fn into_report(task: DownloadTask, outcome: TaskOutcome) -> TaskReport {
    TaskReport {
        index: task.index,
        title: task.item.title,
        source_url: task.item.source_url,
        outcome,
    }
}

/// Creates the directory (not its parents). An existing directory is fine.
pub async fn ensure_output_dir(path: &Path) -> Result<(), SetupError> {
    match fs::create_dir(path).await {
        Ok(()) => {
            info!("created output directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let is_dir = fs::metadata(path)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            if is_dir {
                Ok(())
            } else {
                Err(SetupError::NotADirectory(path.to_path_buf()))
            }
        }
        Err(source) => Err(SetupError::OutputDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a queue plus N spawned workers?
//    - Exactly N downloads can be in flight, one per worker
//    - Workers pop from the front, so tasks start in submission order
//    - tokio::spawn lets the runtime run workers on different threads
//    - Results come back in completion order, which is why the report sorts
//
// 2. Why Arc<Shared>?
//    - tokio::spawn needs 'static futures, so workers cannot borrow the pool
//    - Arc gives every worker an owned handle to the same queue and counters
//
// 3. Why a std Mutex around the queue?
//    - The lock is held only for pop_front(), never across an .await
//
// 4. Why does run() take `self` by value?
//    - A pool handles exactly one batch
//    - Consuming it makes reuse a compile error instead of a convention
// -----------------------------------------------------------------------------
