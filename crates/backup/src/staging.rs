//! Staged dataframe files
//!
//! A dataframe is serialized to a local staging file before upload and read
//! back from one after download. Layout:
//!
//! | bytes | field |
//! |-------|-------|
//! | 4     | magic `NBDF` |
//! | 4     | format version, u32 LE |
//! | 8     | payload length, u64 LE |
//! | n     | bincode-encoded `DataFrame` |

use std::path::Path;

use bytes::Bytes;
use sync_core::{DataFrame, Error, Result};
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Magic bytes for staged dataframe files
pub const FRAME_MAGIC: [u8; 4] = *b"NBDF";

/// Staged dataframe format version
pub const FRAME_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 8;

/// Serialize a frame with its header
pub fn encode_frame(frame: &DataFrame) -> Result<Bytes> {
    let payload = bincode::serialize(frame)?;

    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&FRAME_MAGIC);
    buf.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(&payload);

    Ok(Bytes::from(buf))
}

/// Parse a staged file's bytes back into a frame
pub fn decode_frame(data: &[u8]) -> Result<DataFrame> {
    if data.len() < HEADER_LEN {
        return Err(Error::Serialization(format!(
            "staged dataframe truncated: {} bytes",
            data.len()
        )));
    }

    if data[..4] != FRAME_MAGIC {
        return Err(Error::Serialization("Invalid dataframe magic".to_string()));
    }

    let mut word = [0u8; 4];
    word.copy_from_slice(&data[4..8]);
    let version = u32::from_le_bytes(word);
    if version != FRAME_VERSION {
        warn!("Dataframe version mismatch: expected {}, got {}", FRAME_VERSION, version);
    }

    let mut len = [0u8; 8];
    len.copy_from_slice(&data[8..16]);
    let payload_len = u64::from_le_bytes(len) as usize;

    let payload = &data[HEADER_LEN..];
    if payload.len() != payload_len {
        return Err(Error::Serialization(format!(
            "staged dataframe payload is {} bytes, header says {}",
            payload.len(),
            payload_len
        )));
    }

    let frame: DataFrame = bincode::deserialize(payload)?;
    frame.validate()?;
    Ok(frame)
}

/// Serialize a frame to `path`, creating parent directories
#[instrument(skip(frame), fields(rows = frame.len()))]
pub async fn write_staged(path: &Path, frame: &DataFrame) -> Result<u64> {
    let data = encode_frame(frame)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, &data).await?;

    debug!(path = %path.display(), size = data.len(), "Dataframe staged");
    Ok(data.len() as u64)
}

/// Read and deserialize a staged frame
#[instrument]
pub async fn read_staged(path: &Path) -> Result<DataFrame> {
    let data = fs::read(path).await?;
    decode_frame(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::Cell;

    fn frame() -> DataFrame {
        let mut frame = DataFrame::new(["run", "acc"]);
        frame
            .push_row(vec![Cell::Text("baseline".into()), Cell::Float(0.91)])
            .unwrap();
        frame
    }

    #[test]
    fn test_header_layout() {
        let data = encode_frame(&frame()).unwrap();
        assert_eq!(&data[..4], b"NBDF");
        assert_eq!(&data[4..8], &1u32.to_le_bytes());
        let payload_len = u64::from_le_bytes(data[8..16].try_into().unwrap());
        assert_eq!(payload_len as usize, data.len() - 16);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let result = decode_frame(b"PK\x03\x04 definitely a zip archive");
        assert!(matches!(result, Err(Error::Serialization(_))));

        assert!(decode_frame(b"NBDF").is_err());
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let data = encode_frame(&frame()).unwrap();
        let result = decode_frame(&data[..data.len() - 1]);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[tokio::test]
    async fn test_write_and_read_staged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataframes/nested/results.pkl");

        let size = write_staged(&path, &frame()).await.unwrap();
        assert!(size > 16);

        let restored = read_staged(&path).await.unwrap();
        assert_eq!(restored, frame());
    }
}
