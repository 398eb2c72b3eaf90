//! Worker pool: one dispatcher plus a fixed set of workers sharing a
//! cancellation token.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::dispatcher::{Dispatcher, DispatcherConfig};
use super::handoff::handoff;
use super::worker::Worker;
use crate::tasks::TaskStore;

/// Pool sizing and dispatcher timing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of workers. Fixed for the lifetime of the pool.
    pub workers: usize,
    pub dispatcher: DispatcherConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            dispatcher: DispatcherConfig::default(),
        }
    }
}

/// Running pool. Dropping it leaves the tasks running; call [`WorkerPool::stop`].
pub struct WorkerPool {
    cancel: CancellationToken,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the dispatcher and `config.workers` workers.
    ///
    /// The pool stops when either `shutdown` or the pool's own token is
    /// cancelled.
    pub fn start(store: Arc<TaskStore>, config: PoolConfig, shutdown: &CancellationToken) -> Self {
        let cancel = shutdown.child_token();
        let (offerer, taker) = handoff(config.workers);

        let workers = (0..config.workers)
            .map(|idx| {
                debug!(worker_id = idx, "Starting worker");
                let worker = Worker::new(idx, Arc::clone(&store), taker.clone(), cancel.clone());
                tokio::spawn(worker.run())
            })
            .collect();

        let dispatcher = tokio::spawn(
            Dispatcher::new(store, offerer, config.dispatcher, cancel.clone()).run(),
        );

        info!(workers = config.workers, "Worker pool started");

        Self {
            cancel,
            dispatcher,
            workers,
        }
    }

    /// Number of workers in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Signal cancellation and wait for the dispatcher and every worker to
    /// return. Workers in the middle of a task mark it aborted first.
    pub async fn stop(self) {
        self.cancel.cancel();

        if let Err(e) = self.dispatcher.await {
            error!(error = %e, "Dispatcher task panicked");
        }

        let count = self.workers.len();
        for (idx, handle) in self.workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker_id = idx, error = %e, "Worker task panicked");
            }
        }

        info!(count, "All workers stopped");
    }
}
