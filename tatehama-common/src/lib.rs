//! # Tatehama Common Library
//!
//! Shared code for the interlocking console services including:
//! - Station alarm configuration models
//! - Console state store (active alarms, station list, blink flag)
//! - Configuration loading
//! - Blink ticker driving pulsed alarm cadence

pub mod blink;
pub mod config;
pub mod error;
pub mod state;
pub mod station;

pub use error::{Error, Result};
pub use state::ConsoleState;
pub use station::{ActiveAlarm, AlarmKind, Side, SideAlarm, StationAlarmConfig};
