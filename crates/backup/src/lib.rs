//! Backup and restore for notebook experiments
//!
//! Mirrors tensorboard logs, dataframes and model checkpoints between the
//! local filesystem and a mounted drive, and sends a push notification when
//! a job is done.

pub mod coordinator;
pub mod staging;

pub use coordinator::BackupCoordinator;
pub use staging::{decode_frame, encode_frame, read_staged, write_staged};
