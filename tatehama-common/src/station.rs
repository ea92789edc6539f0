//! Station approach-alarm configuration
//!
//! Each station carries one alarm per direction. The alarm names refer to
//! sound assets by file stem; the looped variant of an alarm is the asset
//! with the `_loop` suffix.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How an active alarm is voiced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum AlarmKind {
    /// Steady tone for as long as the alarm is active
    #[default]
    Continuous,

    /// On/off tone following the blink flag
    Pulsed,
}

impl AlarmKind {
    /// Parse an alarm kind from configuration text.
    ///
    /// `SHORT` and `PULSED` (any case) select [`AlarmKind::Pulsed`]; every
    /// other value is a steady tone.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("SHORT") || text.eq_ignore_ascii_case("PULSED") {
            AlarmKind::Pulsed
        } else {
            AlarmKind::Continuous
        }
    }
}

impl From<String> for AlarmKind {
    fn from(text: String) -> Self {
        AlarmKind::parse(&text)
    }
}

/// Approach direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Up,
    Down,
}

impl Side {
    /// Map the console's `is_up_side` flag to a direction
    pub fn from_up_side(is_up_side: bool) -> Self {
        if is_up_side {
            Side::Up
        } else {
            Side::Down
        }
    }

    pub fn is_up_side(self) -> bool {
        self == Side::Up
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Up => write!(f, "up"),
            Side::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(Side::Up),
            "down" | "d" => Ok(Side::Down),
            other => Err(Error::InvalidInput(format!(
                "unknown direction '{}' (expected up or down)",
                other
            ))),
        }
    }
}

/// Alarm sound assigned to one direction of a station
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SideAlarm {
    /// Base asset name (without the `_loop` suffix)
    pub alarm_name: String,

    #[serde(default)]
    pub kind: AlarmKind,
}

impl SideAlarm {
    pub fn new(alarm_name: impl Into<String>, kind: AlarmKind) -> Self {
        Self {
            alarm_name: alarm_name.into(),
            kind,
        }
    }
}

/// Per-station alarm configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationAlarmConfig {
    pub station_name: String,
    pub up_side: SideAlarm,
    pub down_side: SideAlarm,
}

impl StationAlarmConfig {
    pub fn new(station_name: impl Into<String>, up_side: SideAlarm, down_side: SideAlarm) -> Self {
        Self {
            station_name: station_name.into(),
            up_side,
            down_side,
        }
    }

    /// Alarm configured for the given direction
    pub fn alarm(&self, side: Side) -> &SideAlarm {
        match side {
            Side::Up => &self.up_side,
            Side::Down => &self.down_side,
        }
    }
}

/// Find the first station configuration with a matching name
pub fn find_station<'a>(
    stations: &'a [StationAlarmConfig],
    station_name: &str,
) -> Option<&'a StationAlarmConfig> {
    stations.iter().find(|s| s.station_name == station_name)
}

/// A direction of a station whose approach alarm should currently sound
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveAlarm {
    pub station_name: String,
    pub side: Side,
}

impl ActiveAlarm {
    pub fn new(station_name: impl Into<String>, side: Side) -> Self {
        Self {
            station_name: station_name.into(),
            side,
        }
    }
}
