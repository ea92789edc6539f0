//! # Tatehama Approach Alarm Engine (tatehama-alarm)
//!
//! Plays station approach alarms for the interlocking console.
//!
//! **Purpose:** Load alarm sounds, keep one voice per sound, and every tick
//! reconcile the active alarms against station configuration to decide which
//! looped alarm voices are audible.
//!
//! **Architecture:** symphonia decode → software voices (cpal output) →
//! playback controller → 50 ms reconciliation loop on tokio

pub mod audio;
pub mod catalog;
pub mod console;
pub mod controller;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod volume;

pub use catalog::{AssetCatalog, LoadReport, SoundAsset};
pub use controller::{PlayOutcome, PlaybackController, StopOutcome, VoiceStatus};
pub use engine::{AlarmEngine, EngineConfig, StopAlarmOutcome};
pub use error::{Error, Result};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
