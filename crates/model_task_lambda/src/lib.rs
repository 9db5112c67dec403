//! AWS-oriented adapters and handlers for on-demand model runs.
//!
//! This crate owns runtime integration details (Lambda handlers, the
//! subprocess model runner, workspace staging, and storage adapters) on top
//! of the contracts and codecs in `model_task_core`.

pub mod adapters;
pub mod handlers;
pub mod workspace;
