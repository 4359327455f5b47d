//! Sentinel-terminated worker pool draining a [`TaskQueue`].
//!
//! Spawns W persistent tokio tasks. Worker `i` is handed its index (used by
//! callers to bind it to session `i`) and its own consumer handle, then pops
//! items until it sees [`QueueItem::Done`]. Workers share nothing else; every
//! processed item produces one [`WorkOutcome`] on an unbounded result channel.
//!
//! A hung item is dropped after the safety timeout and a panicking item is
//! caught, so one bad game never stops the worker or its siblings.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use gd_harvest_core::{GameTask, QueueItem};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::queue::TaskQueue;

/// Why an item produced no result of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFailure {
    /// The item ran past the pool's safety timeout and was dropped.
    TimedOut { after: Duration },
    /// Processing panicked.
    Panicked { message: String },
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimedOut { after } => write!(f, "timed out after {}s", after.as_secs()),
            Self::Panicked { message } => write!(f, "worker panicked: {}", message),
        }
    }
}

/// What one worker did with one task.
#[derive(Debug)]
pub struct WorkOutcome<R> {
    pub worker: usize,
    pub task: GameTask,
    pub result: Result<R, ItemFailure>,
}

/// A running pool. Receive outcomes with [`recv`](Self::recv), then
/// [`join`](Self::join) once the result channel is exhausted.
pub struct WorkerPool<R: Send + 'static> {
    result_rx: mpsc::UnboundedReceiver<WorkOutcome<R>>,
    handles: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> WorkerPool<R> {
    /// Spawn `workers` consumers on `queue`.
    ///
    /// The caller is responsible for pushing exactly `workers` sentinels,
    /// before or after this call; until then the workers block on the queue.
    pub fn start<F, Fut>(
        workers: usize,
        queue: &TaskQueue,
        item_timeout: Duration,
        process_fn: F,
    ) -> Self
    where
        F: Fn(usize, GameTask) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::unbounded_channel::<WorkOutcome<R>>();
        let process_fn = Arc::new(process_fn);

        let handles = (0..workers)
            .map(|worker| {
                let consumer = queue.consumer();
                let result_tx = result_tx.clone();
                let process_fn = process_fn.clone();
                tokio::spawn(async move {
                    log::debug!("Worker {} started", worker);
                    let mut processed = 0usize;
                    loop {
                        let task = match consumer.pop().await {
                            QueueItem::Done => break,
                            QueueItem::Task(task) => task,
                        };
                        processed += 1;

                        let work =
                            AssertUnwindSafe(process_fn(worker, task.clone())).catch_unwind();
                        let result = match tokio::time::timeout(item_timeout, work).await {
                            Ok(Ok(r)) => Ok(r),
                            Ok(Err(panic)) => Err(ItemFailure::Panicked {
                                message: panic_message(panic.as_ref()),
                            }),
                            Err(_) => Err(ItemFailure::TimedOut {
                                after: item_timeout,
                            }),
                        };
                        if let Err(ref failure) = result {
                            log::warn!("Worker {}: {} on {}", worker, failure, task);
                        }
                        // Receiver gone: keep draining so sentinels are still consumed
                        let _ = result_tx.send(WorkOutcome {
                            worker,
                            task,
                            result,
                        });
                    }
                    log::debug!("Worker {} done after {} games", worker, processed);
                })
            })
            .collect();

        // Channel closes once every worker has dropped its sender
        drop(result_tx);

        Self { result_rx, handles }
    }

    /// Next outcome, or `None` once every worker has stopped.
    pub async fn recv(&mut self) -> Option<WorkOutcome<R>> {
        self.result_rx.recv().await
    }

    /// Wait for every worker task. Returns the indices of workers that did
    /// not shut down cleanly.
    pub async fn join(self) -> Vec<usize> {
        let mut failed = Vec::new();
        for (worker, handle) in self.handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                log::warn!("Worker {} aborted: {}", worker, e);
                failed.push(worker);
            }
        }
        failed
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "tests/worker_pool_tests.rs"]
mod tests;
