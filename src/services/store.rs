//! src/services/store.rs
//!
//! `RemoteStore` is the capability the handlers use to persist and resolve
//! uploads. The production implementation commits to a GitHub repository
//! (`github_store`); tests inject an in-memory fake. Durability lives
//! entirely on the remote side, so this trait is the whole persistence
//! surface of the service.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file `{0}` not found")]
    NotFound(String),
    #[error("remote store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote store rejected request (HTTP {status}): {body}")]
    Api { status: u16, body: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single committed upload: its path inside the backing repository and
/// the publicly fetchable URL derived from it.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub path: String,
    pub raw_url: String,
}

/// Remote content store the upload and retrieval handlers delegate to.
///
/// Implementations must not retry internally; a failed call surfaces
/// immediately as an error response for the request that made it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Commit `bytes` under `name` at a fresh timestamp-qualified path and
    /// return the stored object. Concurrent uploads of the same name land
    /// on distinct paths and never overwrite each other.
    async fn store(&self, name: &str, bytes: Bytes) -> StoreResult<StoredObject>;

    /// Resolve a previously uploaded name to its public fetch URL.
    /// Returns [`StoreError::NotFound`] when no stored entry matches.
    async fn resolve(&self, name: &str) -> StoreResult<String>;

    /// Cheap reachability probe used by the readiness endpoint.
    async fn ping(&self) -> StoreResult<()>;
}
