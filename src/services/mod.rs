//! Core service layer: upload policy checks, the per-client rate limiter,
//! and the remote store the uploaded bytes are committed to.

pub mod github_store;
pub mod rate_limit;
pub mod store;
pub mod upload_policy;
