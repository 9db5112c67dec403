//! Shared model-task domain primitives.
//!
//! This crate owns the invocation event/response contracts and the archive
//! plus base64 body codecs. It intentionally excludes AWS SDK and Lambda
//! runtime concerns.

pub mod archive;
pub mod contract;
