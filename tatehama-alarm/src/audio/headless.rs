//! Headless output device
//!
//! Runs the same software voices as [`CpalDevice`](crate::audio::CpalDevice)
//! without any hardware. Audio is produced only when [`HeadlessDevice::render`]
//! is called. Used when no sound card is available and for tests.

use crate::audio::mixer::Mixer;
use crate::audio::types::WaveFormat;
use crate::audio::voice::{AudioDevice, Voice};
use crate::error::Result;
use std::sync::Arc;

/// Voice host with no audio output
#[derive(Debug)]
pub struct HeadlessDevice {
    mixer: Arc<Mixer>,
    sample_rate: u32,
    channels: u16,
}

impl HeadlessDevice {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            mixer: Arc::new(Mixer::new()),
            sample_rate,
            channels,
        }
    }

    /// Mix `frames` output frames (interleaved, `channels` wide)
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let channels = self.channels as usize;
        let mut out = vec![0.0; frames * channels];
        self.mixer.mix(&mut out, channels, self.sample_rate);
        out
    }

    pub fn voices_created(&self) -> usize {
        self.mixer.voices_created()
    }

    pub fn voices_released(&self) -> usize {
        self.mixer.voices_released()
    }

    pub fn live_voices(&self) -> usize {
        self.mixer.live_voices()
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(44100, 2)
    }
}

impl AudioDevice for HeadlessDevice {
    fn create_voice(&self, format: WaveFormat, max_frequency_ratio: f32) -> Result<Box<dyn Voice>> {
        Ok(Box::new(self.mixer.create_voice(format, max_frequency_ratio)))
    }

    fn name(&self) -> &str {
        "headless"
    }
}
