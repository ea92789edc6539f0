//! Software voice mixer
//!
//! Implements voices in software for every device: each voice keeps a FIFO
//! of submitted buffers and a playback cursor, and the mixer sums all running
//! voices into the device's output format.
//!
//! # Rendering
//!
//! - Cursor steps by `source_rate / output_rate * frequency_ratio` per
//!   output frame, with linear interpolation between source frames
//! - At the end of the play region the buffer loops while passes remain
//!   ([`LOOP_INFINITE`] never runs out), otherwise it is dequeued
//! - Output = Σ sample × voice volume, clamped to [-1.0, 1.0]
//!
//! Voices at volume 0 keep advancing so a muted looping voice stays in phase.

use crate::audio::types::{SoundBuffer, WaveFormat, LOOP_INFINITE};
use crate::audio::voice::Voice;
use crate::error::{Error, Result};
use crate::lock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Buffer waiting in (or playing from) a voice queue
#[derive(Debug)]
struct QueuedBuffer {
    buffer: SoundBuffer,
    /// Remaining extra passes (ignored for LOOP_INFINITE)
    loops_left: u32,
    /// Cursor in frames, relative to the start of the play region
    position: f64,
}

/// Mutable state of one software voice
#[derive(Debug)]
struct VoiceState {
    format: WaveFormat,
    max_frequency_ratio: f32,
    queue: VecDeque<QueuedBuffer>,
    running: bool,
    volume: f32,
    frequency_ratio: f32,
}

impl VoiceState {
    fn new(format: WaveFormat, max_frequency_ratio: f32) -> Self {
        Self {
            format,
            max_frequency_ratio,
            queue: VecDeque::new(),
            running: false,
            volume: 1.0,
            frequency_ratio: 1.0,
        }
    }

    /// Advance past finished passes; returns false when nothing is left to play
    fn settle_head(&mut self) -> bool {
        while let Some(head) = self.queue.front_mut() {
            let (begin, end) = head.buffer.play_region();
            let len = (end - begin) as f64;

            if len <= 0.0 {
                self.queue.pop_front();
                continue;
            }
            if !head.position.is_finite() {
                head.position = 0.0;
            }
            if head.position < len {
                return true;
            }

            if head.buffer.loop_count == LOOP_INFINITE {
                head.position %= len;
            } else if head.loops_left > 0 {
                head.loops_left -= 1;
                head.position -= len;
            } else {
                self.queue.pop_front();
            }
        }
        false
    }

    /// Add this voice's output into `out` (interleaved, `channels` wide)
    fn render_into(&mut self, out: &mut [f32], channels: usize, sample_rate: u32) {
        if !self.running || self.queue.is_empty() || channels == 0 || sample_rate == 0 {
            return;
        }

        let ratio = sanitize(self.frequency_ratio).clamp(0.0, self.max_frequency_ratio) as f64;
        // A stopped cursor would hold one sample as a DC offset
        if ratio == 0.0 {
            return;
        }
        let step = self.format.sample_rate as f64 / sample_rate as f64 * ratio;
        let src_channels = self.format.channels.max(1) as usize;
        let volume = sanitize(self.volume);

        for frame in out.chunks_mut(channels) {
            if !self.settle_head() {
                break;
            }
            let Some(head) = self.queue.front_mut() else {
                break;
            };

            let (begin, end) = head.buffer.play_region();
            let offset = head.position.floor();
            let frac = (head.position - offset) as f32;
            let index = begin + offset as usize;
            let next = (index + 1).min(end - 1);
            let samples = head.buffer.samples();

            for (c, out_sample) in frame.iter_mut().enumerate() {
                let src_c = c.min(src_channels - 1);
                let s0 = samples[index * src_channels + src_c];
                let s1 = samples[next * src_channels + src_c];
                *out_sample += (s0 + (s1 - s0) * frac) * volume;
            }

            head.position += step;
        }
    }
}

/// Non-finite values render as silence
fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Registry and mixing point for software voices
#[derive(Debug, Default)]
pub struct Mixer {
    voices: Mutex<Vec<(u64, Arc<Mutex<VoiceState>>)>>,
    next_id: AtomicU64,
    created: AtomicUsize,
    released: AtomicUsize,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a voice and register it for mixing
    pub fn create_voice(self: &Arc<Self>, format: WaveFormat, max_frequency_ratio: f32) -> MixerVoice {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(Mutex::new(VoiceState::new(format, max_frequency_ratio)));
        lock(&self.voices).push((id, Arc::clone(&state)));
        self.created.fetch_add(1, Ordering::Relaxed);
        trace!("Created voice {} ({} Hz, {} ch)", id, format.sample_rate, format.channels);

        MixerVoice {
            id,
            state,
            mixer: Arc::clone(self),
            destroyed: false,
        }
    }

    fn release(&self, id: u64) {
        lock(&self.voices).retain(|(voice_id, _)| *voice_id != id);
        self.released.fetch_add(1, Ordering::Relaxed);
        trace!("Released voice {}", id);
    }

    /// Fill `out` with the mix of every running voice
    pub fn mix(&self, out: &mut [f32], channels: usize, sample_rate: u32) {
        out.fill(0.0);

        for (_, voice) in lock(&self.voices).iter() {
            lock(voice).render_into(out, channels, sample_rate);
        }

        for sample in out.iter_mut() {
            *sample = sanitize(*sample).clamp(-1.0, 1.0);
        }
    }

    /// Total voices created since the mixer was built
    pub fn voices_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Total voices released since the mixer was built
    pub fn voices_released(&self) -> usize {
        self.released.load(Ordering::Relaxed)
    }

    /// Voices currently registered
    pub fn live_voices(&self) -> usize {
        lock(&self.voices).len()
    }
}

/// Handle to a software voice owned by a [`Mixer`]
pub struct MixerVoice {
    id: u64,
    state: Arc<Mutex<VoiceState>>,
    mixer: Arc<Mixer>,
    destroyed: bool,
}

impl Voice for MixerVoice {
    fn submit_buffer(&mut self, buffer: &SoundBuffer) -> Result<()> {
        if self.destroyed {
            return Err(Error::Playback(format!("voice {} already released", self.id)));
        }
        let mut state = lock(&self.state);
        if buffer.format() != state.format {
            return Err(Error::Playback(format!(
                "buffer format {:?} does not match voice format {:?}",
                buffer.format(),
                state.format
            )));
        }
        state.queue.push_back(QueuedBuffer {
            buffer: buffer.clone(),
            loops_left: buffer.loop_count,
            position: 0.0,
        });
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.destroyed {
            return Err(Error::Playback(format!("voice {} already released", self.id)));
        }
        lock(&self.state).running = true;
        Ok(())
    }

    fn stop(&mut self) {
        lock(&self.state).running = false;
    }

    fn flush_buffers(&mut self) {
        lock(&self.state).queue.clear();
    }

    fn buffers_queued(&self) -> usize {
        lock(&self.state).queue.len()
    }

    fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    fn set_volume(&mut self, volume: f32) {
        lock(&self.state).volume = volume;
    }

    fn volume(&self) -> f32 {
        lock(&self.state).volume
    }

    fn set_frequency_ratio(&mut self, ratio: f32) {
        lock(&self.state).frequency_ratio = ratio;
    }

    fn frequency_ratio(&self) -> f32 {
        lock(&self.state).frequency_ratio
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        {
            let mut state = lock(&self.state);
            state.running = false;
            state.queue.clear();
        }
        self.mixer.release(self.id);
    }
}

impl Drop for MixerVoice {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;

    fn mono_buffer(values: &[f32]) -> SoundBuffer {
        SoundBuffer::new(values.to_vec(), WaveFormat::new(RATE, 1))
    }

    fn render(mixer: &Mixer, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        mixer.mix(&mut out, 1, RATE);
        out
    }

    #[test]
    fn test_one_shot_dequeues_at_end() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        voice.submit_buffer(&mono_buffer(&[0.5, 0.5, 0.5, 0.5])).unwrap();
        voice.start().unwrap();
        assert_eq!(voice.buffers_queued(), 1);

        let out = render(&mixer, 8);
        assert_eq!(&out[..4], &[0.5, 0.5, 0.5, 0.5]);
        assert_eq!(&out[4..], &[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(voice.buffers_queued(), 0);
    }

    #[test]
    fn test_infinite_loop_never_dequeues() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        let mut buffer = mono_buffer(&[0.25, 0.5]);
        buffer.loop_count = LOOP_INFINITE;
        voice.submit_buffer(&buffer).unwrap();
        voice.start().unwrap();

        let out = render(&mixer, 1000);
        assert_eq!(voice.buffers_queued(), 1);
        assert_eq!(out[998], 0.25);
        assert_eq!(out[999], 0.5);
    }

    #[test]
    fn test_finite_loop_count_plays_extra_passes() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        let mut buffer = mono_buffer(&[1.0, 1.0]);
        buffer.loop_count = 2;
        voice.submit_buffer(&buffer).unwrap();
        voice.start().unwrap();

        let out = render(&mixer, 8);
        assert_eq!(&out[..6], &[1.0; 6]);
        assert_eq!(&out[6..], &[0.0, 0.0]);
        assert_eq!(voice.buffers_queued(), 0);
    }

    #[test]
    fn test_muted_voice_is_silent_but_keeps_running() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        let mut buffer = mono_buffer(&[0.8; 16]);
        buffer.loop_count = LOOP_INFINITE;
        voice.submit_buffer(&buffer).unwrap();
        voice.start().unwrap();
        voice.set_volume(0.0);

        assert!(render(&mixer, 32).iter().all(|s| *s == 0.0));
        assert!(voice.is_running());

        voice.set_volume(0.5);
        assert!(render(&mixer, 4).iter().all(|s| (*s - 0.4).abs() < 1e-6));
    }

    #[test]
    fn test_frequency_ratio_speeds_up_cursor() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        voice.submit_buffer(&mono_buffer(&[0.1, 0.2, 0.3, 0.4])).unwrap();
        voice.set_frequency_ratio(2.0);
        voice.start().unwrap();

        let out = render(&mixer, 4);
        assert_eq!(&out[..2], &[0.1, 0.3]);
        assert_eq!(&out[2..], &[0.0, 0.0]);
    }

    #[test]
    fn test_stopped_voice_keeps_queue() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        voice.submit_buffer(&mono_buffer(&[0.5; 4])).unwrap();
        assert!(render(&mixer, 4).iter().all(|s| *s == 0.0));
        assert_eq!(voice.buffers_queued(), 1);

        voice.flush_buffers();
        assert_eq!(voice.buffers_queued(), 0);
    }

    #[test]
    fn test_mix_clamps_sum() {
        let mixer = Arc::new(Mixer::new());
        let mut a = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);
        let mut b = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        for voice in [&mut a, &mut b] {
            voice.submit_buffer(&mono_buffer(&[0.75; 4])).unwrap();
            voice.start().unwrap();
        }

        assert!(render(&mixer, 4).iter().all(|s| *s == 1.0));
    }

    #[test]
    fn test_mono_source_fills_every_output_channel() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);
        voice.submit_buffer(&mono_buffer(&[0.5, 0.25])).unwrap();
        voice.start().unwrap();

        let mut out = vec![0.0; 4];
        mixer.mix(&mut out, 2, RATE);
        assert_eq!(out, vec![0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_destroy_releases_once() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);
        assert_eq!(mixer.live_voices(), 1);

        voice.destroy();
        voice.destroy();
        drop(voice);

        assert_eq!(mixer.voices_created(), 1);
        assert_eq!(mixer.voices_released(), 1);
        assert_eq!(mixer.live_voices(), 0);
    }

    #[test]
    fn test_drop_releases_voice() {
        let mixer = Arc::new(Mixer::new());
        {
            let _voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);
        }
        assert_eq!(mixer.voices_released(), 1);
    }

    #[test]
    fn test_submit_after_destroy_fails() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);
        voice.destroy();
        assert!(matches!(
            voice.submit_buffer(&mono_buffer(&[0.0])),
            Err(Error::Playback(_))
        ));
    }

    #[test]
    fn test_nan_pitch_renders_silence_and_returns() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        let mut buffer = mono_buffer(&[0.25, 0.5, 0.75]);
        buffer.loop_count = LOOP_INFINITE;
        voice.submit_buffer(&buffer).unwrap();
        voice.start().unwrap();
        voice.set_frequency_ratio(f32::NAN);

        assert_eq!(render(&mixer, 64), vec![0.0; 64]);
        assert_eq!(voice.buffers_queued(), 1);

        // Recovers once a usable pitch is set again
        voice.set_frequency_ratio(1.0);
        assert_eq!(render(&mixer, 3), vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_zero_pitch_is_silent() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        let mut buffer = mono_buffer(&[0.5, 0.5]);
        buffer.loop_count = LOOP_INFINITE;
        voice.submit_buffer(&buffer).unwrap();
        voice.start().unwrap();
        voice.set_frequency_ratio(0.0);

        assert_eq!(render(&mixer, 8), vec![0.0; 8]);
        assert_eq!(voice.buffers_queued(), 1);
    }

    #[test]
    fn test_non_finite_volume_does_not_poison_mix() {
        let mixer = Arc::new(Mixer::new());
        let mut bad = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);
        let mut good = mixer.create_voice(WaveFormat::new(RATE, 1), 4.0);

        for (voice, value) in [(&mut bad, 0.5), (&mut good, 0.25)] {
            let mut buffer = mono_buffer(&[value, value]);
            buffer.loop_count = LOOP_INFINITE;
            voice.submit_buffer(&buffer).unwrap();
            voice.start().unwrap();
        }
        bad.set_volume(f32::NAN);

        assert_eq!(render(&mixer, 4), vec![0.25; 4]);

        bad.set_volume(f32::INFINITY);
        assert_eq!(render(&mixer, 4), vec![0.25; 4]);
    }

    #[test]
    fn test_format_mismatch_rejected() {
        let mixer = Arc::new(Mixer::new());
        let mut voice = mixer.create_voice(WaveFormat::new(44100, 2), 4.0);
        assert!(voice.submit_buffer(&mono_buffer(&[0.0])).is_err());
    }
}
