//! Graceful shutdown of a `tokio::process::Child` with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Shut down a child process, escalating to SIGKILL after `grace`.
///
/// # Strategy
/// 1. If the child already exited, reap it and return
/// 2. Send SIGTERM and wait up to `grace` for it to exit
/// 3. If still running, send SIGKILL
/// 4. Wait for reaping (required to avoid zombies)
///
/// # Platform behavior
/// - Unix: SIGTERM via nix, then SIGKILL via `.kill()`
/// - Windows: `.kill()` immediately (no graceful signal available)
pub async fn shutdown_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    #[cfg(unix)]
    {
        shutdown_unix(child, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(pid) = child.id() else {
        // Already reaped by tokio
        return child.wait().await;
    };
    let raw_pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    if let Err(e) = signal::kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(grace, child.wait()).await {
        return result;
    }

    tracing::debug!(pid, grace_ms = grace.as_millis(), "Grace period elapsed, sending SIGKILL");
    child.kill().await?;
    child.wait().await
}
