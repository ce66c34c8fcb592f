//! Local filesystem storage backend
//!
//! Used both for the mounted drive mirror and for plain local directories.
//! Writes are atomic so an interrupted copy never leaves a half-written file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sync_core::{Error, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::StorageBackend;

/// Local filesystem storage backend
///
/// Stores data in a local directory with support for:
/// - Atomic writes (write to .tmp, then rename)
/// - Automatic directory creation
/// - Recursive file listing
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Base path for all storage operations
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Directory to use as the storage root
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a relative key to its on-disk path
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.base_path.clone()
        } else {
            self.base_path.join(path)
        }
    }

    /// Generate a unique temporary file path
    fn temp_path(&self, path: &str) -> PathBuf {
        let full_path = self.resolve_path(path);
        let temp_name = format!(
            ".{}.{}.tmp",
            full_path.file_name().unwrap_or_default().to_string_lossy(),
            Uuid::new_v4()
        );
        full_path.with_file_name(temp_name)
    }

    /// Turn an on-disk path back into a `/`-separated key
    ///
    /// Keys are strings, so a name that is not valid UTF-8 cannot be
    /// represented and is rejected instead of being rewritten.
    fn relative_key(&self, full_path: &Path) -> Result<String> {
        let relative = full_path
            .strip_prefix(&self.base_path)
            .map_err(|_| Error::Storage {
                message: format!(
                    "{} is outside {}",
                    full_path.display(),
                    self.base_path.display()
                ),
            })?;

        let mut parts = Vec::new();
        for component in relative.components() {
            let part = component.as_os_str().to_str().ok_or_else(|| Error::InvalidPath {
                path: full_path.display().to_string(),
                reason: "file name is not valid UTF-8".to_string(),
            })?;
            parts.push(part);
        }
        Ok(parts.join("/"))
    }

    async fn ensure_parent(full_path: &Path) -> Result<()> {
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage {
                    message: format!("Failed to create directory {:?}: {}", parent, e),
                })?;
        }
        Ok(())
    }

    async fn commit(temp_path: &Path, full_path: &Path) -> Result<()> {
        fs::rename(temp_path, full_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to rename {:?} to {:?}: {}", temp_path, full_path, e),
            })
    }

    /// Copy a file from anywhere on disk to `path` without buffering it
    ///
    /// Same atomicity as `write`: the data lands in a temp file that is
    /// synced and then renamed over the destination.
    ///
    /// # Errors
    /// Returns `StoragePathNotFound` if `source` doesn't exist
    #[instrument(skip(self, source), fields(backend = "local", src = %source.display()))]
    pub async fn import_file(&self, source: &Path, path: &str) -> Result<u64> {
        let full_path = self.resolve_path(path);
        let temp_path = self.temp_path(path);
        Self::ensure_parent(&full_path).await?;

        let size = match fs::copy(source, &temp_path).await {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(if e.kind() == std::io::ErrorKind::NotFound {
                    Error::StoragePathNotFound {
                        path: source.display().to_string(),
                    }
                } else {
                    Error::Storage {
                        message: format!("Failed to copy {:?} to {:?}: {}", source, temp_path, e),
                    }
                });
            }
        };

        let file = fs::File::open(&temp_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to open temp file {:?}: {}", temp_path, e),
            })?;
        file.sync_all().await.map_err(|e| Error::Storage {
            message: format!("Failed to sync file: {}", e),
        })?;

        Self::commit(&temp_path, &full_path).await?;
        debug!(?full_path, size, "File imported successfully");
        Ok(size)
    }

    /// Classify a directory entry for listing without following directory links
    ///
    /// Symlinks to files are listed and read through the link. Symlinks to
    /// directories and dangling links are skipped, so a link back to a parent
    /// can't make the walk recurse.
    async fn entry_kind(entry: &fs::DirEntry) -> Result<EntryKind> {
        let entry_path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| Error::Storage {
            message: format!("Failed to stat {}: {}", entry_path.display(), e),
        })?;

        if file_type.is_dir() {
            return Ok(EntryKind::Dir);
        }
        if file_type.is_file() {
            return Ok(EntryKind::File);
        }
        if !file_type.is_symlink() {
            debug!(path = %entry_path.display(), "Skipping special file");
            return Ok(EntryKind::Skip);
        }

        match fs::metadata(&entry_path).await {
            Ok(target) if target.is_file() => Ok(EntryKind::File),
            Ok(target) if target.is_dir() => {
                warn!(path = %entry_path.display(), "Skipping symlinked directory");
                Ok(EntryKind::Skip)
            }
            Ok(_) => Ok(EntryKind::Skip),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %entry_path.display(), "Skipping dangling symlink");
                Ok(EntryKind::Skip)
            }
            Err(e) => Err(Error::Storage {
                message: format!("Failed to stat {}: {}", entry_path.display(), e),
            }),
        }
    }
}

enum EntryKind {
    Dir,
    File,
    Skip,
}

#[async_trait]
impl StorageBackend for LocalStorage {
    #[instrument(skip(self), fields(backend = "local"))]
    async fn read(&self, path: &str) -> Result<Bytes> {
        let full_path = self.resolve_path(path);
        debug!(?full_path, "Reading file");

        match fs::read(&full_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::StoragePathNotFound {
                path: full_path.display().to_string(),
            }),
            Err(e) => Err(Error::Storage {
                message: format!("Failed to read {}: {}", full_path.display(), e),
            }),
        }
    }

    #[instrument(skip(self, data), fields(backend = "local", size = data.len()))]
    async fn write(&self, path: &str, data: Bytes) -> Result<u64> {
        let full_path = self.resolve_path(path);
        let temp_path = self.temp_path(path);
        let size = data.len() as u64;

        debug!(?full_path, ?temp_path, size, "Writing file atomically");

        Self::ensure_parent(&full_path).await?;

        // Write to temporary file
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to create temp file {:?}: {}", temp_path, e),
            })?;

        file.write_all(&data).await.map_err(|e| Error::Storage {
            message: format!("Failed to write data: {}", e),
        })?;

        file.sync_all().await.map_err(|e| Error::Storage {
            message: format!("Failed to sync file: {}", e),
        })?;

        // Atomic rename, replacing whatever was there
        Self::commit(&temp_path, &full_path).await?;

        debug!(?full_path, size, "File written successfully");
        Ok(size)
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn create_dir_all(&self, path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to create directory {:?}: {}", full_path, e),
            })
    }

    #[instrument(skip(self), fields(backend = "local"))]
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let search_path = self.resolve_path(prefix);
        let mut results = Vec::new();

        debug!(?search_path, "Listing files with prefix");

        // Determine the directory to scan
        let dir_to_scan = if search_path.is_dir() {
            search_path.clone()
        } else if prefix.is_empty() || prefix.ends_with('/') {
            // A directory prefix that doesn't exist has nothing under it
            return Ok(results);
        } else if let Some(parent) = search_path.parent() {
            if parent.is_dir() {
                parent.to_path_buf()
            } else {
                return Ok(results);
            }
        } else {
            return Ok(results);
        };

        // Recursively walk the directory
        let mut stack = vec![dir_to_scan];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| Error::Storage {
                message: format!("Failed to read directory {}: {}", dir.display(), e),
            })?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| Error::Storage {
                message: format!("Failed to read directory {}: {}", dir.display(), e),
            })? {
                match Self::entry_kind(&entry).await? {
                    EntryKind::Dir => stack.push(entry.path()),
                    EntryKind::File => {
                        let key = self.relative_key(&entry.path())?;
                        if key.starts_with(prefix) {
                            results.push(key);
                        }
                    }
                    EntryKind::Skip => {}
                }
            }
        }

        results.sort();
        debug!(count = results.len(), "Found files");
        Ok(results)
    }
}
