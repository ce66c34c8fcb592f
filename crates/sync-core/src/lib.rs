//! Sync Core - Foundation for the notebook backup helper
//!
//! Provides the shared error type, configuration and data types used by
//! the storage, backup, notification and export crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BackupConfig, BeepConfig, BucketLayout, NotifyConfig, SyncConfig};
pub use error::{Error, ErrorKind, Result};
pub use types::*;
