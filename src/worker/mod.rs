//! Worker system: dispatcher, hand-off and the fixed-size pool.
//!
//! Core components:
//! - `handoff`: Zero-buffer rendezvous between dispatcher and idle workers
//! - `dispatcher`: Single loop offering the pending-list head
//! - `worker`: Claim, run the progression, finalize, schedule deletion
//! - `pool`: Startup and shutdown of the dispatcher + N workers

pub mod dispatcher;
pub mod handoff;
pub mod pool;
pub mod worker;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use handoff::{HandOffClosed, Offerer, Taker, handoff};
pub use pool::{PoolConfig, WorkerPool};
pub use worker::Worker;
