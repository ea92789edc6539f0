//! Core audio data types

use std::sync::Arc;

/// Loop count meaning "repeat until stopped"
pub const LOOP_INFINITE: u32 = 255;

/// Format of decoded PCM data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl WaveFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

/// A decoded sound ready to be submitted to a voice.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Interleaved by channel: [c0, c1, c0, c1, ...]
///
/// The sample data is shared; cloning a buffer never copies audio.
#[derive(Debug, Clone)]
pub struct SoundBuffer {
    samples: Arc<[f32]>,
    format: WaveFormat,

    /// Extra passes after the first (0 = one-shot, [`LOOP_INFINITE`] = endless)
    pub loop_count: u32,

    /// First frame to play
    pub play_begin: usize,

    /// Frames to play from `play_begin` (0 = to the end of the buffer)
    pub play_length: usize,
}

impl SoundBuffer {
    pub fn new(samples: Vec<f32>, format: WaveFormat) -> Self {
        Self {
            samples: samples.into(),
            format,
            loop_count: 0,
            play_begin: 0,
            play_length: 0,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn format(&self) -> WaveFormat {
        self.format
    }

    /// Number of frames in the whole buffer
    pub fn frame_count(&self) -> usize {
        let channels = self.format.channels.max(1) as usize;
        self.samples.len() / channels
    }

    /// Frame range selected by `play_begin` / `play_length`, clipped to the buffer
    pub fn play_region(&self) -> (usize, usize) {
        let total = self.frame_count();
        let begin = self.play_begin.min(total);
        let end = if self.play_length == 0 {
            total
        } else {
            begin.saturating_add(self.play_length).min(total)
        };
        (begin, end)
    }

    /// Reset the play region to the whole buffer
    pub fn reset_region(&mut self) {
        self.play_begin = 0;
        self.play_length = 0;
    }

    pub fn is_looping(&self) -> bool {
        self.loop_count > 0
    }

    /// Duration of the whole buffer in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.format.sample_rate == 0 {
            return 0;
        }
        (self.frame_count() as u64 * 1000) / self.format.sample_rate as u64
    }
}
