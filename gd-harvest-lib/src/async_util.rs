//! Drive an async operation while consuming the events it emits.
//!
//! Harvest runs report progress over an mpsc channel; front ends (the CLI's
//! spinners) need to render those events while the run is still going.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// Upper bound on draining leftover events once the task has finished.
/// Leaked sender clones would otherwise keep the channel open forever.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Common face of bounded and unbounded tokio receivers.
#[allow(async_fn_in_trait)]
pub trait EventReceiver<E> {
    /// Next event, or `None` once every sender is dropped.
    async fn recv(&mut self) -> Option<E>;
}

impl<E> EventReceiver<E> for mpsc::Receiver<E> {
    async fn recv(&mut self) -> Option<E> {
        mpsc::Receiver::recv(self).await
    }
}

impl<E> EventReceiver<E> for mpsc::UnboundedReceiver<E> {
    async fn recv(&mut self) -> Option<E> {
        mpsc::UnboundedReceiver::recv(self).await
    }
}

/// Run `task` to completion, calling `on_event` for every event received on
/// `events` along the way and for whatever is still buffered afterwards.
pub async fn run_with_events<F, E, R, Rx>(
    task: F,
    mut events: Rx,
    mut on_event: impl FnMut(E),
) -> R
where
    F: Future<Output = R>,
    Rx: EventReceiver<E> + Unpin,
{
    tokio::pin!(task);
    let mut seen: u64 = 0;

    let result = loop {
        tokio::select! {
            r = &mut task => break Some(r),
            event = events.recv() => match event {
                Some(e) => {
                    seen += 1;
                    on_event(e);
                }
                None => break None,
            },
        }
    };

    let Some(result) = result else {
        log::debug!("run_with_events: channel closed after {} events, awaiting task", seen);
        return task.await;
    };

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(e)) => {
                seen += 1;
                on_event(e);
            }
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "run_with_events: gave up draining after {}s, senders still alive",
                    DRAIN_TIMEOUT.as_secs()
                );
                break;
            }
        }
    }
    log::debug!("run_with_events: {} events handled", seen);
    result
}
