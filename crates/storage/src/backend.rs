//! Storage backend trait definition
//!
//! Defines the async interface that all storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use sync_core::Result;

/// Async trait for storage backends
///
/// Paths are relative, `/`-separated keys inside the backend. Backends never
/// remove data: writes overwrite in place and nothing else is touched.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read data from the given path
    ///
    /// # Errors
    /// Returns `StoragePathNotFound` if the path doesn't exist
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Write data to the given path
    ///
    /// Creates parent directories if they don't exist and replaces any
    /// existing file atomically (write to temp, then rename).
    ///
    /// # Returns
    /// Number of bytes written
    async fn write(&self, path: &str, data: Bytes) -> Result<u64>;

    /// Create a directory and its parents; succeeds if it already exists
    async fn create_dir_all(&self, path: &str) -> Result<()>;

    /// List all file paths under a given prefix, sorted
    ///
    /// # Arguments
    /// * `prefix` - Path prefix to filter by (e.g., "runs/"); empty lists everything
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
