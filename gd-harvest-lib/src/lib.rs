//! Concurrency plumbing for gd-harvest: the sentinel task queue, the worker
//! pool that drains it, event-driven task driving, and settings paths.

pub mod async_util;
pub mod queue;
pub mod settings;
pub mod worker_pool;

pub use gd_harvest_core::{GameTask, QueueItem};
pub use queue::{QueueError, TaskConsumer, TaskProducer, TaskQueue};
pub use worker_pool::{ItemFailure, WorkOutcome, WorkerPool};
