//! Task records and the store that owns them.
//!
//! - `model`: Task record, parameters, status machine (Queued → InProgress → Completed/Aborted)
//! - `store`: Locked map + pending list, TTL deletion
//! - `traits`: `TaskQueue` surface consumed by the HTTP layer

pub mod model;
pub mod store;
pub mod traits;

pub use model::{TaskId, TaskParams, TaskRecord, TaskStatus};
pub use store::TaskStore;
pub use traits::TaskQueue;
