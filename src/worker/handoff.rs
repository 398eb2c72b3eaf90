//! Zero-buffer hand-off between the dispatcher and idle workers.
//!
//! An idle worker registers a one-shot slot and waits on it. The dispatcher
//! pulls the next registered slot and delivers a task id into it, so an id
//! only ever moves to a worker that is waiting at that moment.

use tokio::sync::{mpsc, oneshot};

use crate::tasks::TaskId;

/// All takers are gone; nothing can receive an offer anymore.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("hand-off channel closed")]
pub struct HandOffClosed;

/// Create a hand-off pair. `takers` bounds how many idle workers can be
/// registered at once and should equal the pool size.
pub fn handoff(takers: usize) -> (Offerer, Taker) {
    let (ready_tx, ready_rx) = mpsc::channel(takers.max(1));
    (Offerer { ready: ready_rx }, Taker { ready: ready_tx })
}

/// Dispatcher side.
pub struct Offerer {
    ready: mpsc::Receiver<oneshot::Sender<TaskId>>,
}

impl Offerer {
    /// Deliver `id` to exactly one waiting taker, suspending until one is
    /// ready. Slots left behind by takers that stopped waiting are skipped.
    pub async fn offer(&mut self, id: TaskId) -> Result<(), HandOffClosed> {
        loop {
            let slot = self.ready.recv().await.ok_or(HandOffClosed)?;
            if slot.send(id).is_ok() {
                return Ok(());
            }
        }
    }
}

/// Worker side. Cloned once per worker.
#[derive(Clone)]
pub struct Taker {
    ready: mpsc::Sender<oneshot::Sender<TaskId>>,
}

impl Taker {
    /// Wait for the next offered id. Returns `None` once the offerer is gone.
    pub async fn take(&self) -> Option<TaskId> {
        let (slot, offered) = oneshot::channel();
        self.ready.send(slot).await.ok()?;
        offered.await.ok()
    }
}
