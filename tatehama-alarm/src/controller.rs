//! Playback controller
//!
//! Owns the asset catalog and the master volume, and gives voices the
//! semantics the alarm loop relies on:
//! - `play` does nothing while the voice still has audio queued, so it can be
//!   called every tick without retriggering
//! - volume and pitch of a sounding voice change in place, never by restarting
//! - unknown asset names are reported as outcomes, not errors

use crate::audio::types::LOOP_INFINITE;
use crate::audio::voice::AudioDevice;
use crate::catalog::{AssetCatalog, DecodedFolder, LoadReport};
use crate::error::Result;
use crate::volume::{clamp_volume, effective_volume};
use std::path::Path;
use tracing::{debug, trace};

/// Result of a play request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Buffer submitted and voice started
    Played,
    /// Voice still had audio queued; nothing changed
    AlreadyPlaying,
    /// No asset with that name
    UnknownAsset,
}

/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Voice stopped and its queue flushed
    Stopped,
    /// Voice had nothing queued; nothing changed
    AlreadyIdle,
    /// No asset with that name
    UnknownAsset,
}

/// Snapshot of a voice as last written
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceStatus {
    /// Volume on the voice (master already applied)
    pub volume: f32,
    pub frequency_ratio: f32,
    pub buffers_queued: usize,
    pub loop_count: u32,
    pub running: bool,
}

/// Voice pool with playback semantics and master volume
pub struct PlaybackController {
    catalog: AssetCatalog,
    master_volume: f32,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            catalog: AssetCatalog::new(),
            master_volume: 1.0,
        }
    }

    /// Reload the catalog from `folder`, releasing every current voice first
    pub fn load(&mut self, folder: &Path, device: &dyn AudioDevice) -> Result<LoadReport> {
        let report = self.catalog.load(folder, device)?;
        self.apply_master_to_all();
        Ok(report)
    }

    /// Replace the catalog with sounds decoded ahead of time
    pub fn install(&mut self, decoded: DecodedFolder, device: &dyn AudioDevice) -> LoadReport {
        let report = self.catalog.install(decoded, device);
        self.apply_master_to_all();
        report
    }

    // New voices start at unity; bring them in line with the master volume
    fn apply_master_to_all(&mut self) {
        let master = self.master_volume;
        for asset in self.catalog.assets_mut() {
            asset.voice.set_volume(effective_volume(master, asset.volume));
        }
    }

    /// Release every voice
    pub fn clear(&mut self) -> usize {
        self.catalog.clear()
    }

    /// Start playback of an asset if its voice is idle.
    ///
    /// `looping` selects endless repetition; otherwise the sound plays once.
    pub fn play(&mut self, name: &str, looping: bool, volume: f32, pitch: f32) -> Result<PlayOutcome> {
        match self.catalog.get(name) {
            None => {
                trace!("play: unknown sound '{}'", name);
                return Ok(PlayOutcome::UnknownAsset);
            }
            Some(asset) if asset.is_playing() => return Ok(PlayOutcome::AlreadyPlaying),
            Some(_) => {}
        }

        self.set_volume(name, volume);
        self.set_pitch(name, pitch);

        let Some(asset) = self.catalog.get_mut(name) else {
            return Ok(PlayOutcome::UnknownAsset);
        };

        asset.buffer.loop_count = if looping { LOOP_INFINITE } else { 0 };
        asset.buffer.reset_region();

        asset.voice.submit_buffer(&asset.buffer)?;
        asset.voice.start()?;

        debug!(
            "Playing '{}' (loop={}, volume={:.2}, pitch={:.2})",
            name, looping, volume, pitch
        );
        Ok(PlayOutcome::Played)
    }

    /// Stop an asset's voice and flush its queue
    pub fn stop(&mut self, name: &str) -> Result<StopOutcome> {
        let Some(asset) = self.catalog.get_mut(name) else {
            trace!("stop: unknown sound '{}'", name);
            return Ok(StopOutcome::UnknownAsset);
        };

        if !asset.is_playing() {
            return Ok(StopOutcome::AlreadyIdle);
        }

        asset.voice.stop();
        asset.voice.flush_buffers();
        debug!("Stopped '{}'", name);
        Ok(StopOutcome::Stopped)
    }

    /// Stop every voice unconditionally
    pub fn stop_all(&mut self) {
        for asset in self.catalog.assets_mut() {
            asset.voice.stop();
            asset.voice.flush_buffers();
        }
        debug!("Stopped all {} sounds", self.catalog.len());
    }

    /// Store an asset volume and push `master × volume` to its voice.
    ///
    /// Negative volumes are clamped to 0. Returns false for unknown names.
    pub fn set_volume(&mut self, name: &str, volume: f32) -> bool {
        let master = self.master_volume;
        let Some(asset) = self.catalog.get_mut(name) else {
            return false;
        };

        let volume = clamp_volume(volume);
        asset.volume = volume;
        asset.voice.set_volume(effective_volume(master, volume));
        true
    }

    /// Write a frequency ratio to an asset's voice. Returns false for unknown names.
    pub fn set_pitch(&mut self, name: &str, pitch: f32) -> bool {
        let Some(asset) = self.catalog.get_mut(name) else {
            return false;
        };

        asset.pitch = pitch;
        asset.voice.set_frequency_ratio(pitch);
        true
    }

    /// Set the master volume and re-apply every asset's stored volume
    pub fn set_master_volume(&mut self, volume: f32) {
        let master = clamp_volume(volume);
        self.master_volume = master;
        self.apply_master_to_all();
        debug!("Master volume set to {:.2}", master);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Stored per-asset volume (before master scaling)
    pub fn asset_volume(&self, name: &str) -> Option<f32> {
        self.catalog.get(name).map(|a| a.volume())
    }

    /// Volume currently on the asset's voice
    pub fn effective_volume(&self, name: &str) -> Option<f32> {
        self.catalog.get(name).map(|a| a.voice().volume())
    }

    pub fn voice_status(&self, name: &str) -> Option<VoiceStatus> {
        self.catalog.get(name).map(|asset| {
            let voice = asset.voice();
            VoiceStatus {
                volume: voice.volume(),
                frequency_ratio: voice.frequency_ratio(),
                buffers_queued: voice.buffers_queued(),
                loop_count: asset.loop_count(),
                running: voice.is_running(),
            }
        })
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}
