//! Host resource stats via captured process invocations

use std::fmt;

use sync_core::{Error, Result};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Which host resource to report on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStat {
    /// RAM usage in megabytes
    Memory,

    /// Disk usage per mount
    Disk,

    /// GPU model and utilisation
    Gpu,

    /// CPU model details
    Cpu,
}

impl HostStat {
    pub const ALL: [HostStat; 4] = [HostStat::Memory, HostStat::Disk, HostStat::Gpu, HostStat::Cpu];

    /// Program and arguments that report this stat
    pub fn command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            HostStat::Memory => ("free", &["-m"]),
            HostStat::Disk => ("df", &["-h"]),
            HostStat::Gpu => ("nvidia-smi", &[]),
            HostStat::Cpu => ("cat", &["/proc/cpuinfo"]),
        }
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Program and arguments as invoked
    pub program: String,

    /// Exit code, if the process exited normally
    pub code: Option<i32>,

    pub stdout: String,
    pub stderr: String,
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stdout)
    }
}

/// Run a program directly (no shell) and capture its output
///
/// # Errors
/// Returns `Error::Command` if the program can't be spawned or exits non-zero
#[instrument]
pub async fn run_command(program: &str, args: &[&str]) -> Result<CommandOutput> {
    let display = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Command {
            command: display.clone(),
            message: e.to_string(),
        })?;

    let captured = CommandOutput {
        program: display,
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !output.status.success() {
        warn!(command = %captured.program, code = ?captured.code, "Command exited unsuccessfully");
        return Err(Error::Command {
            command: captured.program,
            message: format!(
                "exit status {}: {}",
                captured
                    .code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                captured.stderr.trim()
            ),
        });
    }

    debug!(command = %captured.program, bytes = captured.stdout.len(), "Command finished");
    Ok(captured)
}

/// Collect one host stat
pub async fn probe(stat: HostStat) -> Result<CommandOutput> {
    let (program, args) = stat.command();
    run_command(program, args).await
}
