//! Alarm engine
//!
//! Ties the playback controller, the shared console state and the
//! reconciliation loop together. One engine is built per output device and
//! passed to whoever needs to play sounds.

use crate::audio::voice::AudioDevice;
use crate::catalog::{decode_folder, DecodedFolder, LoadReport};
use crate::controller::{PlayOutcome, PlaybackController, StopOutcome, VoiceStatus};
use crate::error::{Error, Result};
use crate::lock;
use crate::reconcile::{
    loop_asset_name, spawn_reconciliation_loop, DEFAULT_TICK_INTERVAL, LOOP_MARKER,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tatehama_common::config::{AlarmSettings, DEFAULT_SOUND_FOLDER};
use tatehama_common::station::find_station;
use tatehama_common::{ConsoleState, Side};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Engine startup parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Folder scanned for `.wav` files
    pub sound_folder: PathBuf,
    /// Reconciliation period
    pub tick_interval: Duration,
    pub master_volume: f32,
}

impl EngineConfig {
    /// Build from loaded settings and an already-resolved sound folder
    pub fn from_settings(settings: &AlarmSettings, sound_folder: PathBuf) -> Self {
        Self {
            sound_folder,
            tick_interval: Duration::from_millis(settings.tick_interval_ms),
            master_volume: settings.master_volume,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sound_folder: PathBuf::from(".").join(DEFAULT_SOUND_FOLDER),
            tick_interval: DEFAULT_TICK_INTERVAL,
            master_volume: 1.0,
        }
    }
}

/// Result of stopping a station's alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAlarmOutcome {
    /// Loop muted; carries the outcome of the cleared cue
    Cleared(PlayOutcome),
    /// No configuration for the station; nothing changed
    UnknownStation,
}

/// Audio alarm engine
pub struct AlarmEngine {
    device: Arc<dyn AudioDevice>,
    state: Arc<ConsoleState>,
    config: EngineConfig,
    controller: Arc<Mutex<PlaybackController>>,
    cancel: CancellationToken,
    reconciler: Mutex<Option<JoinHandle<()>>>,
}

impl AlarmEngine {
    /// Build an engine without loading sounds or starting the loop
    pub fn new(device: Arc<dyn AudioDevice>, state: Arc<ConsoleState>, config: EngineConfig) -> Self {
        let mut controller = PlaybackController::new();
        controller.set_master_volume(config.master_volume);

        Self {
            device,
            state,
            config,
            controller: Arc::new(Mutex::new(controller)),
            cancel: CancellationToken::new(),
            reconciler: Mutex::new(None),
        }
    }

    /// Load sounds, start every loop sound muted and spawn the
    /// reconciliation loop.
    ///
    /// Must be called from within a tokio runtime. A sound folder that cannot
    /// be read is logged and leaves the catalog empty until the next reload.
    ///
    /// # Errors
    /// [`Error::Common`] if the tick interval is zero.
    pub fn start(
        device: Arc<dyn AudioDevice>,
        state: Arc<ConsoleState>,
        config: EngineConfig,
    ) -> Result<Self> {
        if config.tick_interval.is_zero() {
            return Err(tatehama_common::Error::InvalidInput(
                "tick interval must be greater than zero".to_string(),
            )
            .into());
        }

        let engine = Self::new(device, state, config);

        match engine.load_sound_files() {
            Ok(report) => debug!(
                "Startup load: {} sounds, {} skipped",
                report.loaded,
                report.failures.len()
            ),
            Err(e) => error!("Sound files not loaded: {}", e),
        }

        engine.loop_sound_all_play();

        let handle = spawn_reconciliation_loop(
            Arc::clone(&engine.controller),
            Arc::clone(&engine.state),
            engine.config.tick_interval,
            engine.cancel.child_token(),
        );
        *lock(&engine.reconciler) = Some(handle);

        info!(
            "Alarm engine started on '{}' (master volume {:.2})",
            engine.device.name(),
            engine.master_volume()
        );
        Ok(engine)
    }

    /// Tear down every voice and reload the sound folder.
    ///
    /// Files are decoded before the controller lock is taken, so the
    /// reconciliation loop only waits while voices are swapped. Loop sounds
    /// are not restarted; call [`AlarmEngine::loop_sound_all_play`]
    /// afterwards, or use [`AlarmEngine::reload`].
    pub fn load_sound_files(&self) -> Result<LoadReport> {
        let decoded = decode_folder(&self.config.sound_folder);
        self.install(decoded)
    }

    /// Reload the sound folder and restart every loop sound muted.
    ///
    /// Decoding runs on the blocking thread pool. Returns the load report and
    /// the number of loop sounds started.
    pub async fn reload(&self) -> Result<(LoadReport, usize)> {
        let folder = self.config.sound_folder.clone();
        let decoded = tokio::task::spawn_blocking(move || decode_folder(&folder))
            .await
            .map_err(|e| Error::asset_load(&self.config.sound_folder, e))?;

        let report = self.install(decoded)?;
        let started = self.loop_sound_all_play();
        Ok((report, started))
    }

    fn install(&self, decoded: Result<DecodedFolder>) -> Result<LoadReport> {
        let mut controller = lock(&self.controller);
        match decoded {
            Ok(decoded) => Ok(controller.install(decoded, self.device.as_ref())),
            Err(e) => {
                controller.clear();
                Err(e)
            }
        }
    }

    /// Start every loop sound (name containing `loop`) looping at volume 0.
    ///
    /// Returns how many voices were started. Sounds already playing are left
    /// alone.
    pub fn loop_sound_all_play(&self) -> usize {
        let mut controller = lock(&self.controller);
        let names: Vec<String> = controller
            .catalog()
            .names()
            .into_iter()
            .filter(|name| name.contains(LOOP_MARKER))
            .collect();

        let mut started = 0;
        for name in &names {
            match controller.play(name, true, 0.0, 1.0) {
                Ok(PlayOutcome::Played) => started += 1,
                Ok(_) => {}
                Err(e) => warn!("Loop sound '{}' not started: {}", name, e),
            }
        }

        info!("Started {} of {} loop sounds muted", started, names.len());
        started
    }

    /// Silence a station's approach alarm and play the cleared cue.
    ///
    /// The direction's loop sound is muted. The cue is the station's up-side
    /// alarm, played once at full volume, whichever direction was cleared.
    pub fn loop_sound_all_stop(&self, station_name: &str, side: Side) -> Result<StopAlarmOutcome> {
        let stations = self.state.stations();
        let Some(station) = find_station(&stations, station_name) else {
            debug!("Stop alarm: no configuration for station '{}'", station_name);
            return Ok(StopAlarmOutcome::UnknownStation);
        };

        let loop_name = loop_asset_name(&station.alarm(side).alarm_name);
        let mut controller = lock(&self.controller);
        controller.set_volume(&loop_name, 0.0);

        let cue = controller.play(&station.up_side.alarm_name, false, 1.0, 1.0)?;
        debug!(
            "Alarm cleared at {} ({} side), cue '{}': {:?}",
            station_name, side, station.up_side.alarm_name, cue
        );
        Ok(StopAlarmOutcome::Cleared(cue))
    }

    pub fn sound_play(&self, name: &str, looping: bool, volume: f32, pitch: f32) -> Result<PlayOutcome> {
        lock(&self.controller).play(name, looping, volume, pitch)
    }

    pub fn sound_stop(&self, name: &str) -> Result<StopOutcome> {
        lock(&self.controller).stop(name)
    }

    pub fn sound_all_stop(&self) {
        lock(&self.controller).stop_all();
    }

    /// Returns false if no sound has that name
    pub fn set_volume(&self, name: &str, volume: f32) -> bool {
        lock(&self.controller).set_volume(name, volume)
    }

    /// Returns false if no sound has that name
    pub fn set_pitch(&self, name: &str, pitch: f32) -> bool {
        lock(&self.controller).set_pitch(name, pitch)
    }

    pub fn set_master_volume(&self, volume: f32) {
        lock(&self.controller).set_master_volume(volume);
    }

    pub fn master_volume(&self) -> f32 {
        lock(&self.controller).master_volume()
    }

    pub fn asset_volume(&self, name: &str) -> Option<f32> {
        lock(&self.controller).asset_volume(name)
    }

    pub fn effective_volume(&self, name: &str) -> Option<f32> {
        lock(&self.controller).effective_volume(name)
    }

    pub fn voice_status(&self, name: &str) -> Option<VoiceStatus> {
        lock(&self.controller).voice_status(name)
    }

    /// Loaded sound names in sorted order
    pub fn sound_names(&self) -> Vec<String> {
        lock(&self.controller).catalog().names()
    }

    pub fn state(&self) -> &Arc<ConsoleState> {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    /// Whether the reconciliation loop has been told to stop
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the reconciliation loop, stop every voice and release the catalog.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handle = lock(&self.reconciler).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Reconciliation loop ended abnormally: {}", e);
            }
        }

        let released = {
            let mut controller = lock(&self.controller);
            controller.stop_all();
            controller.clear()
        };
        if released > 0 {
            info!("Alarm engine shut down ({} sounds released)", released);
        }
    }
}

impl Drop for AlarmEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::HeadlessDevice;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.sound_folder, PathBuf::from("./Sound"));
        assert_eq!(config.tick_interval, Duration::from_millis(50));
        assert_eq!(config.master_volume, 1.0);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = AlarmSettings {
            tick_interval_ms: 20,
            master_volume: 0.5,
            ..Default::default()
        };
        let config = EngineConfig::from_settings(&settings, PathBuf::from("/srv/sound"));
        assert_eq!(config.tick_interval, Duration::from_millis(20));
        assert_eq!(config.master_volume, 0.5);
        assert_eq!(config.sound_folder, PathBuf::from("/srv/sound"));
    }

    #[tokio::test]
    async fn test_zero_tick_interval_rejected() {
        let config = EngineConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        let result = AlarmEngine::start(
            Arc::new(HeadlessDevice::default()),
            Arc::new(ConsoleState::new()),
            config,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_folder_still_starts() {
        let config = EngineConfig {
            sound_folder: PathBuf::from("/nonexistent/tatehama/Sound"),
            ..Default::default()
        };
        let engine = AlarmEngine::start(
            Arc::new(HeadlessDevice::default()),
            Arc::new(ConsoleState::new()),
            config,
        )
        .unwrap();

        assert!(engine.sound_names().is_empty());
        engine.shutdown().await;
        assert!(engine.is_shut_down());
        // Second shutdown is a no-op
        engine.shutdown().await;
    }

    #[test]
    fn test_unknown_station_outcome() {
        let engine = AlarmEngine::new(
            Arc::new(HeadlessDevice::default()),
            Arc::new(ConsoleState::new()),
            EngineConfig::default(),
        );
        assert_eq!(
            engine.loop_sound_all_stop("TH99", Side::Up).unwrap(),
            StopAlarmOutcome::UnknownStation
        );
    }
}
