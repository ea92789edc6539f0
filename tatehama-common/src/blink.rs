//! Blink ticker
//!
//! Toggles the console blink flag on a fixed cadence. Pulsed alarms sample
//! this flag; their on/off rhythm is exactly this ticker's period.

use crate::state::ConsoleState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawn a task that flips the blink flag every `period` until cancelled
pub fn spawn_blink_ticker(
    state: Arc<ConsoleState>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        tick.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Blink ticker stopping");
                    break;
                }
                _ = tick.tick() => {
                    state.toggle_blink_flag();
                }
            }
        }
    })
}
