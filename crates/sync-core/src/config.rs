//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::Bucket;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Backup mirror settings
    pub backup: BackupConfig,

    /// Notification transport settings
    pub notify: NotifyConfig,

    /// Completion sound settings
    pub beep: BeepConfig,
}

impl SyncConfig {
    /// Load a JSON config file; missing fields fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let config: SyncConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.backup.backup_root.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "backup_root must not be empty".to_string(),
            });
        }
        for bucket in Bucket::ALL {
            validate_dir_name(self.backup.buckets.dir_name(bucket))?;
        }
        if self.notify.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "notify.endpoint must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Backup mirror configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Root of the remote-mounted mirror
    pub backup_root: PathBuf,

    /// Subdirectory names for each bucket
    pub buckets: BucketLayout,

    /// Local scratch directory for serialized dataframes
    pub staging_dir: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_root: PathBuf::from("/content/drive/My Drive/MLDS"),
            buckets: BucketLayout::default(),
            staging_dir: std::env::temp_dir().join("nbsync-staging"),
        }
    }
}

/// Mapping from bucket to directory name under the backup root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketLayout {
    pub tensorboard_logs: String,
    pub dataframes: String,
    pub model_checkpoints: String,
}

impl BucketLayout {
    pub fn dir_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::TensorboardLogs => &self.tensorboard_logs,
            Bucket::Dataframes => &self.dataframes,
            Bucket::ModelCheckpoints => &self.model_checkpoints,
        }
    }

    /// Reassign the directory for one bucket
    pub fn set_dir_name(&mut self, bucket: Bucket, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_dir_name(&name)?;
        match bucket {
            Bucket::TensorboardLogs => self.tensorboard_logs = name,
            Bucket::Dataframes => self.dataframes = name,
            Bucket::ModelCheckpoints => self.model_checkpoints = name,
        }
        Ok(())
    }
}

impl Default for BucketLayout {
    fn default() -> Self {
        Self {
            tensorboard_logs: "runs".to_string(),
            dataframes: "dataframes".to_string(),
            model_checkpoints: "models_states".to_string(),
        }
    }
}

/// Bucket directories are exactly one normal path component
fn validate_dir_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::InvalidPath {
            path: name.to_string(),
            reason: "bucket directory must be a single relative component".to_string(),
        }),
    }
}

/// Push-notification transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Message endpoint of the notification service
    pub endpoint: String,

    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.pushover.net/1/messages.json".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Completion sound configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeepConfig {
    /// Number of rings
    pub times: u32,

    /// Pause after each ring
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for BeepConfig {
    fn default() -> Self {
        Self {
            times: 2,
            interval: Duration::from_secs(2),
        }
    }
}

/// Duration serialization helper for human-readable formats
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
