//! End-to-end notebook session
//!
//! Simulates a training notebook that is backed up to a mounted drive,
//! loses its local disk (a fresh runtime), and restores everything:
//! - Tensorboard logs round-trip through the drive
//! - A metrics dataframe round-trips and is exported to a workbook
//! - A model checkpoint round-trips
//! - A completion notification reaches the push endpoint

use anyhow::Result;
use backup::BackupCoordinator;
use sheets::{export_dataframe, CsvWorkbook};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use sync_core::{
    BackupConfig, Bucket, BucketLayout, Cell, DataFrame, NotificationConfig, NotificationKind,
    NotifyConfig, SyncConfig,
};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One notebook runtime: its own local disk and staging area, sharing the drive
struct Runtime {
    local: PathBuf,
    coordinator: BackupCoordinator,
}

fn runtime(base: &Path, name: &str, drive: &Path, endpoint: &str) -> Result<Runtime> {
    let mut config = SyncConfig::default();
    config.backup = BackupConfig {
        backup_root: drive.to_path_buf(),
        buckets: BucketLayout::default(),
        staging_dir: base.join(name).join("staging"),
    };
    config.notify = NotifyConfig {
        endpoint: endpoint.to_string(),
        ..NotifyConfig::default()
    };

    Ok(Runtime {
        local: base.join(name).join("content"),
        coordinator: BackupCoordinator::from_config(&config)?,
    })
}

fn tree(root: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root)?.to_string_lossy().into_owned();
                files.insert(rel, std::fs::read(&path)?);
            }
        }
    }
    Ok(files)
}

fn metrics() -> Result<DataFrame> {
    let mut frame = DataFrame::new(["epoch", "train_loss", "val_acc", "note"]);
    for epoch in 1..=5i64 {
        let loss = 1.0 / epoch as f64;
        let note = if epoch == 5 {
            Cell::Text("best".to_string())
        } else {
            Cell::Null
        };
        frame.push_row(vec![
            Cell::Int(epoch),
            Cell::Float(loss),
            Cell::Float(0.8 + epoch as f64 / 100.0),
            note,
        ])?;
    }
    Ok(frame)
}

#[tokio::test]
async fn test_full_session_survives_runtime_reset() -> Result<()> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/messages.json"))
        .and(body_string_contains("token=app-token"))
        .and(body_string_contains("user=user-key"))
        .and(body_string_contains("message=%5BDONE%5D%0Aepoch+5+finished"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":1}"#))
        .expect(1)
        .mount(&server)
        .await;
    let endpoint = format!("{}/1/messages.json", server.uri());

    let base = TempDir::new()?;
    let drive = base.path().join("drive/My Drive/MLDS");

    // 1. First runtime trains and backs everything up
    let mut first = runtime(base.path(), "first", &drive, &endpoint)?;
    let logs = first.local.join("runs");
    for (rel, content) in [
        ("resnet/events.out.tfevents.1", "epoch-1-scalars"),
        ("resnet/events.out.tfevents.2", "epoch-2-scalars"),
        ("resnet/validation/events.out.tfevents.3", "val-scalars"),
    ] {
        let file = logs.join(rel);
        std::fs::create_dir_all(file.parent().unwrap())?;
        std::fs::write(file, content)?;
    }
    let checkpoint = first.local.join("resnet_epoch5.pt");
    std::fs::write(&checkpoint, vec![7u8; 4096])?;

    let report = first
        .coordinator
        .backup_directory(&logs, Bucket::TensorboardLogs)
        .await?;
    assert_eq!(report.files, 3);

    first
        .coordinator
        .backup_dataframe(&metrics()?, Bucket::Dataframes, "resnet_history.pkl")
        .await?;
    first
        .coordinator
        .backup_checkpoint(&checkpoint, "resnet/epoch5.pt")
        .await?;

    first
        .coordinator
        .set_notification(NotificationConfig::pushover("app-token", "user-key")?)?;
    first
        .coordinator
        .notify(&NotificationKind::Done, "epoch 5 finished")
        .await?;

    // 2. Drive layout matches the documented buckets
    assert!(drive.join("runs/resnet/events.out.tfevents.1").is_file());
    assert!(drive.join("dataframes/resnet_history.pkl").is_file());
    assert!(drive.join("models_states/resnet/epoch5.pt").is_file());

    // 3. A fresh runtime restores from the drive
    let second = runtime(base.path(), "second", &drive, &endpoint)?;
    let restored_logs = second.local.join("runs");
    second
        .coordinator
        .restore_directory(Bucket::TensorboardLogs, &restored_logs)
        .await?;
    assert_eq!(tree(&restored_logs)?, tree(&logs)?);

    let frame = second
        .coordinator
        .restore_dataframe(Bucket::Dataframes, "resnet_history.pkl")
        .await?;
    assert_eq!(frame, metrics()?);

    let restored_ckpt = second.local.join("resnet_epoch5.pt");
    second
        .coordinator
        .restore_checkpoint("resnet/epoch5.pt", &restored_ckpt)
        .await?;
    assert_eq!(std::fs::read(&restored_ckpt)?, vec![7u8; 4096]);

    // 4. Export the restored metrics
    let workbook = CsvWorkbook::new(second.local.join("sheets"));
    let sheet = export_dataframe(&workbook, &frame, "resnet_history", "metrics").await?;
    let csv = std::fs::read_to_string(second.local.join("sheets").join(&sheet.0).join("metrics.csv"))?;
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("epoch,train_loss,val_acc,note"));
    assert_eq!(lines.next(), Some("1,1,0.81,"));
    assert_eq!(csv.lines().count(), 6);

    Ok(())
}

#[tokio::test]
async fn test_second_backup_merges_with_first() -> Result<()> {
    let base = TempDir::new()?;
    let drive = base.path().join("drive");
    let rt = runtime(base.path(), "rt", &drive, "http://127.0.0.1:9/unused")?;
    let logs = rt.local.join("runs");

    std::fs::create_dir_all(logs.join("run-a"))?;
    std::fs::write(logs.join("run-a/events"), "a")?;
    rt.coordinator
        .backup_directory(&logs, Bucket::TensorboardLogs)
        .await?;

    // Local run-a is cleaned up; run-b is new
    std::fs::remove_dir_all(logs.join("run-a"))?;
    std::fs::create_dir_all(logs.join("run-b"))?;
    std::fs::write(logs.join("run-b/events"), "b")?;
    rt.coordinator
        .backup_directory(&logs, Bucket::TensorboardLogs)
        .await?;

    let mirrored = tree(&drive.join("runs"))?;
    assert_eq!(mirrored.len(), 2);
    assert_eq!(mirrored["run-a/events"], b"a");
    assert_eq!(mirrored["run-b/events"], b"b");
    Ok(())
}
