//! Shared per-process state handed to every request handler.

use crate::services::{rate_limit::RateLimiter, store::RemoteStore};
use std::sync::Arc;

/// Everything a handler needs: the injected remote store, the shared rate
/// limiter, and the request-shaping knobs read once at startup. Cloned per
/// request by axum; all clones observe the same limiter map.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RemoteStore>,
    pub limiter: RateLimiter,
    pub max_file_size: u64,
    pub public_base_url: String,
}
