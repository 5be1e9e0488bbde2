use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::events::RefreshTrigger;
use crate::slideshow::{Coordinator, FailureKind};

#[derive(Debug, Clone, Copy)]
pub struct RefreshSchedule {
    pub interval: Duration,
    /// Step to the next image after each timed refresh (slideshow pacing).
    pub auto_advance: bool,
}

/// Periodically re-fetches the asset list.
///
/// Rules:
/// - The first tick fires one interval after start; the startup refresh is the caller's job.
/// - Missed ticks are skipped rather than replayed in a burst.
/// - A tick that lands while a manual refresh is running joins that fetch.
/// - Failures are already logged by the coordinator; the loop keeps going.
/// - Cancellation drops any refresh this task is awaiting.
#[instrument(skip(coordinator, cancel), fields(interval = %humantime::format_duration(schedule.interval)))]
pub async fn run(
    coordinator: Coordinator,
    schedule: RefreshSchedule,
    cancel: CancellationToken,
) -> Result<()> {
    let mut ticker = interval_at(Instant::now() + schedule.interval, schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(auto_advance = schedule.auto_advance, "refresh task started");

    loop {
        select! {
            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                let outcome = select! {
                    _ = cancel.cancelled() => break,
                    res = coordinator.refresh(RefreshTrigger::Timer) => res,
                };
                match outcome {
                    Ok(report) => {
                        if schedule.auto_advance && coordinator.advance_if_live() {
                            debug!(count = report.count, index = coordinator.index(), "auto-advanced");
                        }
                    }
                    Err(err) if err.kind == FailureKind::Cancelled => break,
                    Err(err) => {
                        debug!(kind = ?err.kind, "timed refresh failed");
                    }
                }
            }
        }
    }

    info!("cancel received; exiting refresh task");
    Ok(())
}
