//! In-memory arithmetic progression queue with a dispatcher-fed worker pool.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod tasks;
pub mod worker;
