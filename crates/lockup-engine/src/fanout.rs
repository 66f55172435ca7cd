//! Clock-driven state republishing.
//!
//! On every tick each live position recomputes its state and publishes it on
//! its current channel. The first tick that finds a position expired sends an
//! expiry notice instead; later ticks keep reporting the (now fixed) reward so
//! nothing is stranded. A failure on one position is logged and the loop moves
//! on to the next.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lockup_core::types::Timestamp;

use crate::engine::LockupEngine;
use crate::position::PositionPhase;

/// Outcome of one fan-out pass.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Notifications stored on a channel, expiry notices included.
    pub delivered: usize,
    pub expired_announced: usize,
    pub failed: usize,
}

/// Recompute and publish the state of every live position as of `now`.
pub async fn notify_all(engine: &LockupEngine, now: Timestamp) -> FanoutReport {
    let mut report = FanoutReport::default();
    for (lockup_id, handle) in engine.position_handles() {
        let mut position = handle.lock().await;
        if position.phase() == PositionPhase::Redeemed || position.publication().is_finished() {
            continue;
        }

        let state = match position.check_state(now, engine.evaluator()) {
            Ok(state) => state,
            Err(e) => {
                warn!(%lockup_id, error = %e, "state computation failed");
                if let Err(e) = position.publication().fail(e.to_string()) {
                    debug!(%lockup_id, error = %e, "channel already closed");
                }
                report.failed += 1;
                continue;
            }
        };

        let expiring = position.take_expiry_notice();
        let sent = if expiring {
            position.publication().announce_expiry(state)
        } else {
            position.publication().publish(state)
        };
        match sent {
            Ok(()) => {
                report.delivered += 1;
                if expiring {
                    report.expired_announced += 1;
                    info!(%lockup_id, "lockup expired");
                }
            }
            Err(e) => {
                warn!(%lockup_id, error = %e, "publication failed");
                report.failed += 1;
            }
        }
    }
    debug!(
        now,
        delivered = report.delivered,
        expired = report.expired_announced,
        failed = report.failed,
        "fan-out pass complete"
    );
    report
}

/// Run a fan-out pass on every tick until the tick stream closes.
pub async fn run(engine: Arc<LockupEngine>, mut ticks: broadcast::Receiver<Timestamp>) {
    loop {
        let now = match ticks.recv().await {
            Ok(now) => now,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "fan-out lagged behind clock ticks");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("tick stream closed, stopping fan-out");
                break;
            }
        };
        notify_all(&engine, now).await;
    }
}

/// Subscribe to the engine's clock at its configured cadence and spawn [`run`].
pub fn spawn(engine: Arc<LockupEngine>) -> JoinHandle<()> {
    let ticks = engine.clock().subscribe_ticks(engine.tick_interval_secs());
    tokio::spawn(run(engine, ticks))
}
