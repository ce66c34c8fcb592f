//! nbsync binary entry point
//!
//! Backs up and restores experiment artifacts, sends push notifications,
//! prints host stats and rings the completion bell.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backup::BackupCoordinator;
use host::HostStat;
use sheets::{export_dataframe, CsvWorkbook};
use sync_core::{Bucket, NotificationConfig, NotificationKind, NotificationService, SyncConfig};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "nbsync", version, about = "Notebook experiment backup helper")]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the backup root from the config
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a local directory into a bucket
    Backup {
        #[arg(short, long, default_value = "tensorboard-logs")]
        bucket: Bucket,

        #[arg(short, long, default_value = "./runs")]
        dir: PathBuf,
    },

    /// Copy a bucket into a local directory
    Restore {
        #[arg(short, long, default_value = "tensorboard-logs")]
        bucket: Bucket,

        #[arg(short, long, default_value = "./runs")]
        dir: PathBuf,
    },

    /// Upload a model checkpoint file
    PushCheckpoint {
        #[arg(short, long)]
        file: PathBuf,

        /// Name under the checkpoints bucket (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Download a model checkpoint file
    PullCheckpoint {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export a backed-up dataframe to a CSV workbook
    Export {
        #[arg(short, long, default_value = "dataframes")]
        bucket: Bucket,

        /// Dataframe name inside the bucket
        #[arg(short, long)]
        name: String,

        /// Workbook root directory
        #[arg(short, long, default_value = "./sheets")]
        out: PathBuf,

        /// Spreadsheet title (defaults to the dataframe name)
        #[arg(long)]
        title: Option<String>,

        #[arg(long, default_value = "Sheet1")]
        worksheet: String,
    },

    /// Send a push notification
    Notify {
        #[arg(short, long, default_value = "DONE")]
        kind: NotificationKind,

        #[arg(short, long, default_value = "")]
        message: String,

        /// JPEG image to attach
        #[arg(long)]
        image: Option<PathBuf>,

        #[arg(long, env = "PUSHOVER_APP_TOKEN", hide_env_values = true)]
        app_token: Option<String>,

        #[arg(long, env = "PUSHOVER_USER_TOKEN", hide_env_values = true)]
        user_token: Option<String>,
    },

    /// Print host resource stats (all of them when none are given)
    Stats {
        #[arg(value_enum)]
        stats: Vec<StatArg>,
    },

    /// Ring the terminal bell
    Beep {
        #[arg(short, long)]
        times: Option<u32>,

        /// Pause after each ring, in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatArg {
    Memory,
    Disk,
    Gpu,
    Cpu,
}

impl From<StatArg> for HostStat {
    fn from(arg: StatArg) -> Self {
        match arg {
            StatArg::Memory => HostStat::Memory,
            StatArg::Disk => HostStat::Disk,
            StatArg::Gpu => HostStat::Gpu,
            StatArg::Cpu => HostStat::Cpu,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BoxError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nbsync=info,backup=info,storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };
    if let Some(root) = cli.root {
        config.backup.backup_root = root;
    }

    run(cli.command, config).await
}

async fn run(command: Commands, config: SyncConfig) -> Result<(), BoxError> {
    match command {
        Commands::Backup { bucket, dir } => {
            let coordinator = BackupCoordinator::from_config(&config)?;
            let report = coordinator.backup_directory(&dir, bucket).await?;
            println!(
                "Backed up {} files ({} bytes) from {} to {}",
                report.files,
                report.bytes,
                dir.display(),
                coordinator.bucket_path(bucket).display()
            );
        }
        Commands::Restore { bucket, dir } => {
            let coordinator = BackupCoordinator::from_config(&config)?;
            let report = coordinator.restore_directory(bucket, &dir).await?;
            println!(
                "Restored {} files ({} bytes) from {} to {}",
                report.files,
                report.bytes,
                coordinator.bucket_path(bucket).display(),
                dir.display()
            );
        }
        Commands::PushCheckpoint { file, name } => {
            let coordinator = BackupCoordinator::from_config(&config)?;
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or("checkpoint path has no file name")?,
            };
            let report = coordinator.backup_checkpoint(&file, &name).await?;
            println!("Uploaded checkpoint {} ({} bytes)", name, report.bytes);
        }
        Commands::PullCheckpoint { name, file } => {
            let coordinator = BackupCoordinator::from_config(&config)?;
            let report = coordinator.restore_checkpoint(&name, &file).await?;
            println!(
                "Downloaded checkpoint {} to {} ({} bytes)",
                name,
                file.display(),
                report.bytes
            );
        }
        Commands::Export {
            bucket,
            name,
            out,
            title,
            worksheet,
        } => {
            let coordinator = BackupCoordinator::from_config(&config)?;
            let frame = coordinator.restore_dataframe(bucket, &name).await?;
            let title = title.unwrap_or_else(|| spreadsheet_title(&name));
            let workbook = CsvWorkbook::new(&out);
            let sheet = export_dataframe(&workbook, &frame, &title, &worksheet).await?;
            println!(
                "Exported {} rows to {}",
                frame.len(),
                out.join(&sheet.0).join(format!("{}.csv", worksheet)).display()
            );
        }
        Commands::Notify {
            kind,
            message,
            image,
            app_token,
            user_token,
        } => {
            let params = [("app_token", app_token), ("user_token", user_token)]
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
                .collect();
            let credentials = NotificationConfig::new(NotificationService::Pushover, params)?;

            let mut coordinator = BackupCoordinator::from_config(&config)?;
            coordinator.set_notification(credentials)?;
            match image {
                Some(image) => coordinator.notify_with_image(&kind, &message, image).await?,
                None => coordinator.notify(&kind, &message).await?,
            }
            println!("Notification sent");
        }
        Commands::Stats { stats } => {
            let stats: Vec<HostStat> = if stats.is_empty() {
                HostStat::ALL.to_vec()
            } else {
                stats.into_iter().map(HostStat::from).collect()
            };

            let mut failure = None;
            for stat in stats {
                let (program, args) = stat.command();
                println!("== {} {} ==", program, args.join(" "));
                match host::probe(stat).await {
                    Ok(output) => print!("{}", output),
                    Err(e) => {
                        tracing::warn!(?stat, error = %e, "Stat unavailable");
                        failure = Some(e);
                    }
                }
            }
            if let Some(e) = failure {
                return Err(e.into());
            }
        }
        Commands::Beep { times, interval_ms } => {
            let times = times.unwrap_or(config.beep.times);
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or(config.beep.interval);
            host::beep_stdout(times, interval).await?;
        }
    }

    Ok(())
}

/// Default spreadsheet title: the dataframe's file stem
fn spreadsheet_title(name: &str) -> String {
    let file = name.rsplit('/').next().unwrap_or(name);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}
