//! Storage - Backends and merge copies for the backup mirror
//!
//! Provides async storage operations over a local filesystem root. The
//! mounted drive and ordinary local directories are both `LocalStorage`
//! instances, so a backup is a merge copy between two backends.
//!
//! # Example
//!
//! ```no_run
//! use storage::{copy_prefix, LocalStorage};
//!
//! # async fn example() -> sync_core::Result<()> {
//! let local = LocalStorage::new("./runs");
//! let drive = LocalStorage::new("/content/drive/My Drive/MLDS");
//! let report = copy_prefix(&local, "", &drive, "runs").await?;
//! println!("copied {} files", report.files);
//! # Ok(())
//! # }
//! ```

mod backend;
mod local;
mod transfer;

pub use backend::StorageBackend;
pub use local::LocalStorage;
pub use transfer::{copy_prefix, dir_prefix, join_key};
