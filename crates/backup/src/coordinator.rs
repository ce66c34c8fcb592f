//! Backup coordinator for mirroring notebook artifacts to a mounted drive

use std::path::{Component, Path, PathBuf};

use notify::{build_notifier, format_message, Notifier};
use storage::{copy_prefix, join_key, LocalStorage, StorageBackend};
use sync_core::{
    BackupConfig, Bucket, BucketLayout, DataFrame, Error, NotificationConfig, NotificationKind,
    NotifyConfig, Result, SyncConfig, SyncReport,
};
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::staging::{read_staged, write_staged};

/// Copies logs, dataframes and checkpoints between local paths and the backup root
///
/// The backup root and its bucket directories are created on first use.
/// Copies merge into the destination: same-named files are overwritten,
/// nothing is ever deleted.
#[derive(Debug)]
pub struct BackupCoordinator {
    /// Root of the mounted mirror
    root: PathBuf,

    /// Bucket to directory mapping
    layout: BucketLayout,

    /// Local scratch space for serialized dataframes
    staging_dir: PathBuf,

    /// Transport settings used when building notifiers
    notify_settings: NotifyConfig,

    /// Configured notification channel
    notifier: Option<Box<dyn Notifier>>,
}

impl BackupCoordinator {
    /// Create a coordinator; nothing is touched on disk yet
    pub fn new(config: BackupConfig, notify_settings: NotifyConfig) -> Self {
        let coordinator = Self {
            root: config.backup_root,
            layout: config.buckets,
            staging_dir: config.staging_dir,
            notify_settings,
            notifier: None,
        };
        coordinator.announce_root();
        coordinator
    }

    /// Create a coordinator from a validated config
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.backup.clone(), config.notify.clone()))
    }

    fn announce_root(&self) {
        if self.root.is_dir() {
            warn!(
                root = %self.root.display(),
                "Backup folder already exists; files with the same name will be overwritten"
            );
        } else {
            info!(
                root = %self.root.display(),
                "Backup folder doesn't exist yet; it will be created on first use"
            );
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.root
    }

    /// Point the coordinator at a different mirror root
    pub fn set_backup_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
        self.announce_root();
    }

    pub fn layout(&self) -> &BucketLayout {
        &self.layout
    }

    /// Reassign the directory name used for a bucket
    pub fn set_bucket_dir(&mut self, bucket: Bucket, name: impl Into<String>) -> Result<()> {
        self.layout.set_dir_name(bucket, name)
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn set_staging_dir(&mut self, dir: impl Into<PathBuf>) {
        self.staging_dir = dir.into();
    }

    /// Absolute location of a bucket under the backup root
    pub fn bucket_path(&self, bucket: Bucket) -> PathBuf {
        self.root.join(self.layout.dir_name(bucket))
    }

    /// Create the root and every bucket directory if missing
    async fn ensure_layout(&self) -> Result<LocalStorage> {
        let remote = LocalStorage::new(&self.root);
        remote.create_dir_all("").await?;
        for bucket in Bucket::ALL {
            remote.create_dir_all(self.layout.dir_name(bucket)).await?;
        }
        Ok(remote)
    }

    fn remote_key(&self, bucket: Bucket, key: &str) -> String {
        join_key(self.layout.dir_name(bucket), key)
    }

    fn staging_path(&self, bucket: Bucket, key: &str) -> PathBuf {
        self.staging_dir.join(self.layout.dir_name(bucket)).join(key)
    }

    /// Copy the contents of `local_dir` into a bucket
    ///
    /// # Errors
    /// Returns `StoragePathNotFound` if `local_dir` is not a directory
    #[instrument(skip(self, local_dir), fields(local_dir = %local_dir.as_ref().display()))]
    pub async fn backup_directory(
        &self,
        local_dir: impl AsRef<Path>,
        bucket: Bucket,
    ) -> Result<SyncReport> {
        let local_dir = local_dir.as_ref();
        let is_dir = fs::metadata(local_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(Error::StoragePathNotFound {
                path: local_dir.display().to_string(),
            });
        }

        let remote = self.ensure_layout().await?;
        let local = LocalStorage::new(local_dir);
        let report = copy_prefix(&local, "", &remote, self.layout.dir_name(bucket)).await?;

        info!(%bucket, files = report.files, bytes = report.bytes, "Directory backed up");
        Ok(report)
    }

    /// Copy the contents of a bucket into `local_dir`, creating it if needed
    #[instrument(skip(self, local_dir), fields(local_dir = %local_dir.as_ref().display()))]
    pub async fn restore_directory(
        &self,
        bucket: Bucket,
        local_dir: impl AsRef<Path>,
    ) -> Result<SyncReport> {
        let remote = self.ensure_layout().await?;
        let local = LocalStorage::new(local_dir.as_ref());
        local.create_dir_all("").await?;

        let report = copy_prefix(&remote, self.layout.dir_name(bucket), &local, "").await?;
        if report.files == 0 {
            warn!(%bucket, "Bucket is empty; nothing restored");
        }

        info!(%bucket, files = report.files, bytes = report.bytes, "Directory restored");
        Ok(report)
    }

    /// Serialize `frame` to the staging area, then copy it to `bucket/name`
    #[instrument(skip(self, frame), fields(rows = frame.len()))]
    pub async fn backup_dataframe(
        &self,
        frame: &DataFrame,
        bucket: Bucket,
        name: &str,
    ) -> Result<SyncReport> {
        let key = object_key(name)?;
        let staged = self.staging_path(bucket, &key);
        write_staged(&staged, frame).await?;

        let remote = self.ensure_layout().await?;
        let size = remote
            .import_file(&staged, &self.remote_key(bucket, &key))
            .await?;

        info!(%bucket, name = %key, size, "Dataframe backed up");
        Ok(SyncReport::new(1, size))
    }

    /// Copy `bucket/name` to the staging area and deserialize it
    #[instrument(skip(self))]
    pub async fn restore_dataframe(&self, bucket: Bucket, name: &str) -> Result<DataFrame> {
        let key = object_key(name)?;
        let remote = self.ensure_layout().await?;
        let stored = remote.resolve_path(&self.remote_key(bucket, &key));

        let staged = self.staging_path(bucket, &key);
        let (staging, file_name) = split_file(&staged)?;
        staging.import_file(&stored, &file_name).await?;
        let frame = read_staged(&staged).await?;

        info!(%bucket, name = %key, rows = frame.len(), "Dataframe restored");
        Ok(frame)
    }

    /// Copy a model checkpoint file into the checkpoints bucket as `name`
    ///
    /// The file is copied on disk, never loaded into memory.
    #[instrument(skip(self, local_file), fields(local_file = %local_file.as_ref().display()))]
    pub async fn backup_checkpoint(
        &self,
        local_file: impl AsRef<Path>,
        name: &str,
    ) -> Result<SyncReport> {
        let key = object_key(name)?;
        let remote = self.ensure_layout().await?;
        let size = remote
            .import_file(
                local_file.as_ref(),
                &self.remote_key(Bucket::ModelCheckpoints, &key),
            )
            .await?;

        info!(name = %key, size, "Checkpoint backed up");
        Ok(SyncReport::new(1, size))
    }

    /// Copy checkpoint `name` from the checkpoints bucket to `local_file`
    #[instrument(skip(self, local_file), fields(local_file = %local_file.as_ref().display()))]
    pub async fn restore_checkpoint(
        &self,
        name: &str,
        local_file: impl AsRef<Path>,
    ) -> Result<SyncReport> {
        let key = object_key(name)?;
        let remote = self.ensure_layout().await?;
        let stored = remote.resolve_path(&self.remote_key(Bucket::ModelCheckpoints, &key));
        let (local, file_name) = split_file(local_file.as_ref())?;
        let size = local.import_file(&stored, &file_name).await?;

        info!(name = %key, size, "Checkpoint restored");
        Ok(SyncReport::new(1, size))
    }

    /// Validate credentials and install the matching notifier
    ///
    /// A failed call leaves any previously configured notifier in place.
    pub fn set_notification(&mut self, config: NotificationConfig) -> Result<()> {
        config.validate()?;
        let notifier = build_notifier(&config, &self.notify_settings)?;
        info!(service = notifier.name(), "Notification channel configured");
        self.notifier = Some(notifier);
        Ok(())
    }

    /// Install a custom notification channel
    pub fn set_notifier(&mut self, notifier: Box<dyn Notifier>) {
        self.notifier = Some(notifier);
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// Send `[KIND]\nmessage` through the configured channel
    ///
    /// # Errors
    /// Returns `Error::Authentication` if no channel has been configured
    pub async fn notify(&self, kind: &NotificationKind, message: &str) -> Result<()> {
        self.deliver(kind, message, None).await
    }

    /// Like `notify`, with a JPEG image attached
    pub async fn notify_with_image(
        &self,
        kind: &NotificationKind,
        message: &str,
        image: impl AsRef<Path>,
    ) -> Result<()> {
        self.deliver(kind, message, Some(image.as_ref())).await
    }

    async fn deliver(
        &self,
        kind: &NotificationKind,
        message: &str,
        attachment: Option<&Path>,
    ) -> Result<()> {
        let notifier = self.notifier.as_ref().ok_or_else(|| Error::Authentication {
            message: "notification parameters are not set; call set_notification first"
                .to_string(),
        })?;
        notifier.send(&format_message(kind, message), attachment).await
    }
}

/// Turn a user-supplied name into a `/`-separated relative key
fn object_key(name: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidPath {
        path: name.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(invalid("must be relative and must not contain '..'")),
        }
    }
    if parts.is_empty() {
        return Err(invalid("must not be empty"));
    }
    Ok(parts.join("/"))
}

/// Split a file path into a storage rooted at its parent plus the file key
fn split_file(path: &Path) -> Result<(LocalStorage, String)> {
    let file_name = path.file_name().ok_or_else(|| Error::InvalidPath {
        path: path.display().to_string(),
        reason: "not a file path".to_string(),
    })?;
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    Ok((
        LocalStorage::new(parent),
        file_name.to_string_lossy().into_owned(),
    ))
}
