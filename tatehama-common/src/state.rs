//! Shared console state
//!
//! Holds the data the alarm engine observes but never owns: the station
//! alarm configuration, the list of currently active alarms and the blink
//! flag. Lists are published as immutable snapshots so a reader iterating
//! one never observes a concurrent edit.

use crate::station::{ActiveAlarm, Side, StationAlarmConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Console state shared between the UI side and the alarm engine
#[derive(Debug, Default)]
pub struct ConsoleState {
    stations: RwLock<Arc<Vec<StationAlarmConfig>>>,
    active_alarms: RwLock<Arc<Vec<ActiveAlarm>>>,
    blink: AtomicBool,
}

impl ConsoleState {
    /// Create an empty state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state store seeded with station configuration
    pub fn with_stations(stations: Vec<StationAlarmConfig>) -> Self {
        let state = Self::new();
        state.set_stations(stations);
        state
    }

    /// Current station configuration snapshot
    pub fn stations(&self) -> Arc<Vec<StationAlarmConfig>> {
        Arc::clone(&self.stations.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the station configuration
    pub fn set_stations(&self, stations: Vec<StationAlarmConfig>) {
        *self.stations.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(stations);
    }

    /// Current active-alarm snapshot
    pub fn active_alarms(&self) -> Arc<Vec<ActiveAlarm>> {
        Arc::clone(&self.active_alarms.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the whole active-alarm list
    pub fn set_active_alarms(&self, alarms: Vec<ActiveAlarm>) {
        *self.active_alarms.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(alarms);
    }

    /// Append an active alarm (duplicates are kept)
    pub fn add_active_alarm(&self, alarm: ActiveAlarm) {
        let mut guard = self.active_alarms.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::clone(&guard);
        next.push(alarm);
        *guard = Arc::new(next);
    }

    /// Remove every entry for the given station and direction.
    ///
    /// Returns the number of entries removed.
    pub fn remove_active_alarm(&self, station_name: &str, side: Side) -> usize {
        let mut guard = self.active_alarms.write().unwrap_or_else(PoisonError::into_inner);
        let next: Vec<ActiveAlarm> = guard
            .iter()
            .filter(|a| !(a.station_name == station_name && a.side == side))
            .cloned()
            .collect();
        let removed = guard.len() - next.len();
        if removed > 0 {
            *guard = Arc::new(next);
        }
        removed
    }

    pub fn clear_active_alarms(&self) {
        self.set_active_alarms(Vec::new());
    }

    /// Current blink flag value
    pub fn blink_flag(&self) -> bool {
        self.blink.load(Ordering::Acquire)
    }

    pub fn set_blink_flag(&self, value: bool) {
        self.blink.store(value, Ordering::Release);
    }

    /// Flip the blink flag, returning the new value
    pub fn toggle_blink_flag(&self) -> bool {
        !self.blink.fetch_xor(true, Ordering::AcqRel)
    }
}
