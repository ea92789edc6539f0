//! Configuration loading and sound folder resolution

use crate::station::StationAlarmConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the sound folder
pub const SOUND_DIR_ENV: &str = "TATEHAMA_SOUND_DIR";

/// Folder name used when nothing else is configured
pub const DEFAULT_SOUND_FOLDER: &str = "Sound";

/// Alarm engine settings as read from the TOML config file
///
/// ```toml
/// sound_folder = "Sound"
/// tick_interval_ms = 50
/// blink_interval_ms = 500
/// master_volume = 1.0
///
/// [[stations]]
/// station_name = "TH65"
/// up_side = { alarm_name = "approach_a", kind = "SHORT" }
/// down_side = { alarm_name = "approach_b", kind = "LONG" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlarmSettings {
    pub sound_folder: Option<PathBuf>,
    pub tick_interval_ms: u64,
    pub blink_interval_ms: u64,
    pub master_volume: f32,
    pub stations: Vec<StationAlarmConfig>,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            sound_folder: None,
            tick_interval_ms: 50,
            blink_interval_ms: 500,
            master_volume: 1.0,
            stations: Vec::new(),
        }
    }
}

impl AlarmSettings {
    /// Parse settings from TOML text and validate them
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: AlarmSettings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and parse a settings file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_toml_str(&text)?;
        info!(
            "Loaded alarm settings from {} ({} stations)",
            path.display(),
            settings.stations.len()
        );
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be greater than 0".to_string()));
        }
        if self.blink_interval_ms == 0 {
            return Err(Error::Config("blink_interval_ms must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Load settings following the lookup order:
/// 1. Explicit path (must exist and parse)
/// 2. Platform config file, if present
/// 3. Built-in defaults
pub fn load_settings(cli_path: Option<&Path>) -> Result<AlarmSettings> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(Error::NotFound(format!("Config file {}", path.display())));
        }
        return AlarmSettings::load(path);
    }

    if let Some(path) = default_config_file() {
        if path.exists() {
            return AlarmSettings::load(&path);
        }
        debug!("No config file at {}, using defaults", path.display());
    }

    Ok(AlarmSettings::default())
}

/// Sound folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. `Sound` relative to the working directory (fallback)
pub fn resolve_sound_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    settings: &AlarmSettings,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &settings.sound_folder {
        return path.clone();
    }

    // Priority 4: relative default
    PathBuf::from(".").join(DEFAULT_SOUND_FOLDER)
}

/// Platform config file location (`<config dir>/tatehama/alarm.toml`)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tatehama").join("alarm.toml"))
}
