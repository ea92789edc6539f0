//! Playback voice and device abstractions
//!
//! A voice is one playback channel bound to a wave format. Buffers are
//! submitted to it and it is started and stopped independently of every
//! other voice. The device creates voices and mixes them to its output.

use crate::audio::types::{SoundBuffer, WaveFormat};
use crate::error::Result;

/// Highest frequency ratio a voice is created for
pub const DEFAULT_MAX_FREQUENCY_RATIO: f32 = 4.0;

/// One playback channel.
///
/// A voice must be released exactly once. [`Voice::destroy`] releases it;
/// later calls are no-ops, and implementations destroy on drop if the owner
/// never did.
pub trait Voice: Send {
    /// Queue a buffer for playback after any already queued
    fn submit_buffer(&mut self, buffer: &SoundBuffer) -> Result<()>;

    /// Start consuming queued buffers
    fn start(&mut self) -> Result<()>;

    /// Stop consuming buffers; queued buffers stay queued
    fn stop(&mut self);

    /// Drop every queued buffer
    fn flush_buffers(&mut self);

    /// Number of buffers queued, including the one playing
    fn buffers_queued(&self) -> usize;

    /// Whether the voice has been started and not stopped since
    fn is_running(&self) -> bool;

    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    /// Playback speed as a ratio of the source rate (1.0 = unchanged)
    fn set_frequency_ratio(&mut self, ratio: f32);

    fn frequency_ratio(&self) -> f32;

    /// Release the voice back to the device
    fn destroy(&mut self);
}

/// Audio output device able to create voices
pub trait AudioDevice: Send + Sync {
    /// Create a voice for the given format
    fn create_voice(&self, format: WaveFormat, max_frequency_ratio: f32) -> Result<Box<dyn Voice>>;

    /// Human-readable device name for logs
    fn name(&self) -> &str;
}
