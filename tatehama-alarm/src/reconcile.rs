//! Alarm reconciliation loop
//!
//! Every tick the loop reads the active alarms, looks up each station's
//! configuration and sets the volume of the direction's looped alarm sound.
//! Loop sounds are started once, muted, at engine startup; this loop only
//! ever changes their volume, so pulsing never restarts a voice.
//!
//! Pulsed alarms sample the shared blink flag. The loop does not time the
//! pulse itself: the on/off cadence is whatever rate the flag toggles at.

use crate::controller::PlaybackController;
use crate::lock;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tatehama_common::station::find_station;
use tatehama_common::{AlarmKind, ConsoleState};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Suffix of the looped variant of an alarm sound
pub const LOOP_SUFFIX: &str = "_loop";

/// Marker identifying sounds started as silent loops at startup
pub const LOOP_MARKER: &str = "loop";

/// Default reconciliation period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Name of the looped asset for an alarm
pub fn loop_asset_name(alarm_name: &str) -> String {
    format!("{}{}", alarm_name, LOOP_SUFFIX)
}

/// Volume an active alarm should have right now
pub fn target_volume(kind: AlarmKind, blink: bool) -> f32 {
    match kind {
        AlarmKind::Pulsed => {
            if blink {
                1.0
            } else {
                0.0
            }
        }
        AlarmKind::Continuous => 1.0,
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Active alarms whose loop volume was written
    pub applied: usize,
    /// Active alarms skipped (unknown station or sound)
    pub skipped: usize,
}

/// Run one reconciliation pass.
///
/// Active alarms are processed in list order. An alarm for a station with no
/// configuration, or whose loop sound is not loaded, is skipped silently.
pub fn reconcile_tick(controller: &mut PlaybackController, state: &ConsoleState) -> TickSummary {
    let stations = state.stations();
    let alarms = state.active_alarms();
    let blink = state.blink_flag();

    let mut summary = TickSummary::default();

    for alarm in alarms.iter() {
        let Some(station) = find_station(&stations, &alarm.station_name) else {
            trace!("No configuration for station '{}'", alarm.station_name);
            summary.skipped += 1;
            continue;
        };

        let side_alarm = station.alarm(alarm.side);
        let name = loop_asset_name(&side_alarm.alarm_name);
        let volume = target_volume(side_alarm.kind, blink);

        if controller.set_volume(&name, volume) {
            summary.applied += 1;
        } else {
            trace!("Loop sound '{}' not loaded", name);
            summary.skipped += 1;
        }
    }

    summary
}

/// Spawn the reconciliation loop on the current tokio runtime.
///
/// The loop ticks every `period` until `cancel` fires.
pub fn spawn_reconciliation_loop(
    controller: Arc<Mutex<PlaybackController>>,
    state: Arc<ConsoleState>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Alarm reconciliation loop started ({} ms tick)", period.as_millis());

        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Alarm reconciliation loop stopping");
                    break;
                }
                _ = tick.tick() => {
                    let summary = reconcile_tick(&mut lock(&controller), &state);
                    if summary.applied + summary.skipped > 0 {
                        trace!(
                            "Reconciled {} alarms ({} skipped)",
                            summary.applied, summary.skipped
                        );
                    }
                }
            }
        }

        info!("Alarm reconciliation loop stopped");
    })
}
