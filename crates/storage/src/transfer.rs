//! Merge copies between storage backends
//!
//! Every file under the source prefix is written to the same relative key
//! under the destination prefix. Existing destination files with the same
//! key are overwritten; everything else at the destination is left alone.

use sync_core::{Result, SyncReport};
use tracing::{debug, info, instrument};

use crate::StorageBackend;

/// Normalize a prefix so it names a directory ("" stays the root)
pub fn dir_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// Join a directory prefix and a relative key
pub fn join_key(prefix: &str, key: &str) -> String {
    format!("{}{}", dir_prefix(prefix), key.trim_start_matches('/'))
}

/// Copy everything under `src_prefix` in `src` to `dst_prefix` in `dst`
///
/// Files are copied one at a time, in sorted key order. The first failure
/// aborts the copy and is returned unchanged; files already copied stay.
#[instrument(skip(src, dst))]
pub async fn copy_prefix(
    src: &dyn StorageBackend,
    src_prefix: &str,
    dst: &dyn StorageBackend,
    dst_prefix: &str,
) -> Result<SyncReport> {
    let src_prefix = dir_prefix(src_prefix);
    let dst_prefix = dir_prefix(dst_prefix);

    if !dst_prefix.is_empty() {
        dst.create_dir_all(&dst_prefix).await?;
    }

    let keys = src.list(&src_prefix).await?;
    let mut bytes = 0u64;

    for key in &keys {
        let relative = key.strip_prefix(src_prefix.as_str()).unwrap_or(key);
        let target = join_key(&dst_prefix, relative);

        let data = src.read(key).await?;
        bytes += dst.write(&target, data).await?;
        debug!(%key, %target, "Copied file");
    }

    let report = SyncReport::new(keys.len() as u64, bytes);
    info!(files = report.files, bytes = report.bytes, "Merge copy complete");
    Ok(report)
}
