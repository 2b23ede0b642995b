//! Represents a file entry listed from the remote store.

use serde::Deserialize;

/// One entry beneath the uploads directory of the backing repository, as
/// returned by the contents API. `download_url` is absent for entries that
/// are not plain files (subdirectories, submodules).
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
    /// Stored name, timestamp-prefixed: `<unixMillis>-<sanitized-name>`.
    pub name: String,

    /// Size in bytes as reported by the remote store.
    pub size: u64,

    /// Content hash assigned by the remote store.
    pub sha: String,

    /// Direct fetch URL for the raw content.
    pub download_url: Option<String>,
}
