//! Shared fixtures for integration tests
//!
//! Writes small deterministic WAV files into temporary sound folders.

#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tatehama_alarm::audio::{AudioDevice, HeadlessDevice};
use tatehama_common::{AlarmKind, SideAlarm, StationAlarmConfig};
use tempfile::TempDir;

/// Sample rate of generated fixtures
pub const TEST_SAMPLE_RATE: u32 = 8000;

/// Write a 16-bit sine tone WAV file
pub fn write_tone_wav(path: &Path, duration_ms: u64, channels: u16) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;

    let frames = TEST_SAMPLE_RATE as u64 * duration_ms / 1000;
    for n in 0..frames {
        let t = n as f32 / TEST_SAMPLE_RATE as f32;
        let sample = ((2.0 * PI * 440.0 * t).sin() * 0.5 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()
}

/// Temporary sound folder containing one mono tone per name
pub fn sound_folder(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for name in names {
        write_tone_wav(&dir.path().join(format!("{}.wav", name)), 200, 1).expect("write fixture");
    }
    dir
}

/// Add another sound to an existing folder
pub fn add_sound(folder: &Path, name: &str) -> PathBuf {
    let path = folder.join(format!("{}.wav", name));
    write_tone_wav(&path, 200, 1).expect("write fixture");
    path
}

/// Headless device, plus the same device as a trait object
pub fn headless() -> (Arc<HeadlessDevice>, Arc<dyn AudioDevice>) {
    let device = Arc::new(HeadlessDevice::default());
    let dyn_device: Arc<dyn AudioDevice> = device.clone();
    (device, dyn_device)
}

/// Station TH65: pulsed up-side `approach_a`, continuous down-side `approach_b`
pub fn station_th65() -> StationAlarmConfig {
    StationAlarmConfig::new(
        "TH65",
        SideAlarm::new("approach_a", AlarmKind::Pulsed),
        SideAlarm::new("approach_b", AlarmKind::Continuous),
    )
}

/// Sound folder matching [`station_th65`] plus an unrelated chime
pub fn th65_sounds() -> TempDir {
    sound_folder(&[
        "approach_a",
        "approach_a_loop",
        "approach_b",
        "approach_b_loop",
        "chime",
    ])
}
