//! Process liveness monitoring primitive.
//!
//! The monitor is policy-free: it checks whether the owned child is still
//! alive and yields status changes. What a death means (status writes,
//! events) is decided by the consumer.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_util::Stream;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::process::SupervisedProcess;

/// Observed liveness of a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessHealth {
    /// Still running at the last check.
    Alive,
    /// Exited; `code` is `None` when killed by a signal.
    Exited { code: Option<i32> },
}

/// Continuous liveness monitor for one process.
///
/// Checks every `interval` and yields only when the status changes:
/// `Alive` first, then `Exited` after which the stream ends. The stream
/// also ends, without yielding, once the cancellation token fires.
pub struct ProcessHealthMonitor {
    process: Arc<SupervisedProcess>,
    interval: Duration,
    cancel_token: CancellationToken,
}

enum Check {
    Cancelled,
    Status(ProcessHealth),
}

impl ProcessHealthMonitor {
    pub fn new(
        process: Arc<SupervisedProcess>,
        check_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            process,
            interval: check_interval,
            cancel_token,
        }
    }

    /// One liveness check. Never waits on the child lock past cancellation,
    /// so a concurrent shutdown holding the lock cannot stall the monitor.
    async fn check(process: &SupervisedProcess, cancel_token: &CancellationToken) -> Check {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => Check::Cancelled,
            mut child = process.lock_child() => match child.try_wait() {
                Ok(Some(status)) => Check::Status(ProcessHealth::Exited { code: status.code() }),
                Ok(None) => Check::Status(ProcessHealth::Alive),
                Err(e) => {
                    warn!(pid = process.pid(), error = %e, "Liveness check failed");
                    Check::Status(ProcessHealth::Alive)
                }
            },
        }
    }

    /// Start monitoring and return a stream of liveness changes.
    pub fn monitor(self) -> impl Stream<Item = ProcessHealth> {
        let process = self.process;
        let cancel_token = self.cancel_token;
        let check_interval = self.interval;

        stream! {
            let mut ticker = interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut last_status: Option<ProcessHealth> = None;
            debug!(pid = process.pid(), interval_ms = check_interval.as_millis(), "Starting health monitor");

            loop {
                tokio::select! {
                    biased;
                    () = cancel_token.cancelled() => {
                        debug!(pid = process.pid(), "Health monitor cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let current = match ProcessHealthMonitor::check(&process, &cancel_token).await {
                            Check::Cancelled => {
                                debug!(pid = process.pid(), "Health monitor cancelled");
                                break;
                            }
                            Check::Status(status) => status,
                        };
                        debug!(pid = process.pid(), ?current, "Health tick");

                        if last_status != Some(current) {
                            yield current;
                            last_status = Some(current);
                        }
                        if matches!(current, ProcessHealth::Exited { .. }) {
                            break;
                        }
                    }
                }
            }
        }
    }
}
