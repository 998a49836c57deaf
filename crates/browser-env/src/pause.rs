//! Operator-driven pause/resume for debugging a live browser session.
//!
//! The pause never times out on its own: the test's timeout is raised to a
//! very large value beforehand and control returns only when the operator
//! sends one of the resume signals on standard input.

use crate::error::Result;
use std::io::IsTerminal;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Timeout applied to a paused test so the runner does not kill it (4 days).
pub const PAUSE_TIMEOUT: Duration = Duration::from_millis(345_600_000);

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const CARRIAGE_RETURN: u8 = b'\r';
const LINE_FEED: u8 = b'\n';

fn is_resume_byte(byte: u8) -> bool {
    // Interrupt, end-of-transmission, or Enter (raw mode delivers CR,
    // line-buffered input delivers LF).
    matches!(byte, CTRL_C | CTRL_D | CARRIAGE_RETURN | LINE_FEED)
}

/// Reads `input` until a resume signal arrives.
///
/// End-of-input counts as end-of-transmission and resumes as well.
pub(crate) async fn wait_for_resume<R>(input: &mut R) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 64];
    loop {
        let n = input.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        if buf[..n].iter().copied().any(is_resume_byte) {
            return Ok(());
        }
    }
}

/// Enables raw mode only when nothing else owns the terminal mode, and
/// restores it on drop only in that case.
struct RawModeGuard {
    activated: bool,
}

impl RawModeGuard {
    fn engage() -> std::io::Result<Self> {
        if !std::io::stdin().is_terminal() {
            return Ok(Self { activated: false });
        }
        if crossterm::terminal::is_raw_mode_enabled()? {
            // Another consumer already switched the terminal; leave its
            // mode untouched on resume.
            return Ok(Self { activated: false });
        }
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self { activated: true })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.activated {
            let _ = crossterm::terminal::disable_raw_mode();
        }
    }
}

/// Suspends until the operator resumes via standard input.
pub(crate) async fn pause_until_resumed() -> Result<()> {
    let guard = RawModeGuard::engage()?;

    eprintln!("\n🕵️  Code is paused, press enter to resume");

    let mut stdin = tokio::io::stdin();
    wait_for_resume(&mut stdin).await?;

    drop(guard);
    debug!("pause resumed by operator input");
    Ok(())
}
