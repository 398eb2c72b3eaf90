//! HTTP layer: axum routes over the `TaskQueue` surface.

pub mod dto;
pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{AppState, task_routes};
