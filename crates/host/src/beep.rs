//! Audible completion signal
//!
//! Rings the terminal bell, which notebook and terminal frontends turn into
//! a sound or a visual flash.

use std::io::Write;
use std::time::Duration;

use sync_core::Result;
use tracing::debug;

const BELL: &[u8] = b"\x07";

/// Ring the bell `times` times, pausing `interval` after each ring
pub async fn beep<W: Write>(out: &mut W, times: u32, interval: Duration) -> Result<()> {
    for ring in 0..times {
        out.write_all(BELL)?;
        out.flush()?;
        debug!(ring = ring + 1, times, "Beep");
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

/// Ring the bell on stdout
pub async fn beep_stdout(times: u32, interval: Duration) -> Result<()> {
    let mut stdout = std::io::stdout();
    beep(&mut stdout, times, interval).await
}
