//! Discovery → fetch handoff queue.
//!
//! An unbounded multi-producer multi-consumer FIFO built on `async-channel`.
//! Producers push [`GameTask`]s; once every producer is finished the owner
//! pushes one [`QueueItem::Done`] per consumer. The queue never exposes a
//! "closed" state: consumers simply drain until they see their sentinel.

use gd_harvest_core::{GameTask, QueueItem};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// Every receiving handle is gone; the item was not queued
    #[error("Task queue has no consumers left")]
    Disconnected,
}

/// Owner of the queue. Hands out producer and consumer handles.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: async_channel::Sender<QueueItem>,
    rx: async_channel::Receiver<QueueItem>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }

    /// A handle for a discovery unit.
    pub fn producer(&self) -> TaskProducer {
        TaskProducer {
            tx: self.tx.clone(),
        }
    }

    /// A handle for one fetch worker. Each worker must take its own.
    pub fn consumer(&self) -> TaskConsumer {
        TaskConsumer {
            rx: self.rx.clone(),
        }
    }

    /// Push exactly `workers` sentinels, one per consumer.
    pub fn push_sentinels(&self, workers: usize) -> Result<(), QueueError> {
        for _ in 0..workers {
            self.tx
                .try_send(QueueItem::Done)
                .map_err(|_| QueueError::Disconnected)?;
        }
        log::debug!("Pushed {} sentinels", workers);
        Ok(())
    }

    /// Items currently waiting, sentinels included.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Producer side of the queue.
#[derive(Debug, Clone)]
pub struct TaskProducer {
    tx: async_channel::Sender<QueueItem>,
}

impl TaskProducer {
    /// Enqueue one game. Never blocks: the queue is unbounded.
    pub fn push(&self, task: GameTask) -> Result<(), QueueError> {
        self.tx
            .try_send(QueueItem::Task(task))
            .map_err(|_| QueueError::Disconnected)
    }
}

/// Consumer side of the queue.
#[derive(Debug, Clone)]
pub struct TaskConsumer {
    rx: async_channel::Receiver<QueueItem>,
}

impl TaskConsumer {
    /// Wait for the next item.
    ///
    /// A channel with no senders left can never deliver a sentinel, so it is
    /// reported as `Done` to keep consumers from hanging.
    pub async fn pop(&self) -> QueueItem {
        self.rx.recv().await.unwrap_or(QueueItem::Done)
    }
}

#[cfg(test)]
#[path = "tests/queue_tests.rs"]
mod tests;
