//! Audio output using cpal
//!
//! Opens a hardware output stream and mixes every software voice into it.
//! The cpal stream handle is not `Send` on every platform, so it lives on a
//! dedicated thread for the whole lifetime of the device; the device itself
//! only holds the shared mixer and a shutdown channel.

use crate::audio::mixer::Mixer;
use crate::audio::types::WaveFormat;
use crate::audio::voice::{AudioDevice, Voice};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Host, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Preferred output rate; the device default is used when unsupported
const PREFERRED_SAMPLE_RATE: u32 = 44100;

/// What the output thread reports back once the stream is running
struct OutputInfo {
    name: String,
    sample_rate: u32,
    channels: u16,
}

/// Hardware output device backed by cpal
pub struct CpalDevice {
    name: String,
    sample_rate: u32,
    channels: u16,
    mixer: Arc<Mixer>,
    /// Stream error counter, incremented by the cpal error callback
    error_count: Arc<AtomicU32>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalDevice {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::Device(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device and start mixing.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    ///
    /// If the named device is missing, falls back to the default device.
    ///
    /// # Errors
    /// [`Error::Device`] when no device can be opened or the stream fails to start.
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let mixer = Arc::new(Mixer::new());
        let error_count = Arc::new(AtomicU32::new(0));

        let (ready_tx, ready_rx) = mpsc::channel::<Result<OutputInfo>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let requested = device_name.map(str::to_string);
        let thread_mixer = Arc::clone(&mixer);
        let thread_errors = Arc::clone(&error_count);

        let thread = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match open_stream(requested.as_deref(), thread_mixer, thread_errors) {
                    Ok((stream, info)) => {
                        let _ = ready_tx.send(Ok(info));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Park until the device is dropped; the stream stops with it
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("Audio output thread exiting");
            })
            .map_err(|e| Error::Device(format!("Failed to spawn audio thread: {}", e)))?;

        let info = ready_rx
            .recv()
            .map_err(|_| Error::Device("Audio thread exited during startup".to_string()))??;

        info!(
            "Audio output started on '{}' ({} Hz, {} channels)",
            info.name, info.sample_rate, info.channels
        );

        Ok(Self {
            name: info.name,
            sample_rate: info.sample_rate,
            channels: info.channels,
            mixer,
            error_count,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of stream errors reported by the backend
    pub fn stream_errors(&self) -> u32 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn mixer(&self) -> &Arc<Mixer> {
        &self.mixer
    }
}

impl AudioDevice for CpalDevice {
    fn create_voice(&self, format: WaveFormat, max_frequency_ratio: f32) -> Result<Box<dyn Voice>> {
        Ok(Box::new(self.mixer.create_voice(format, max_frequency_ratio)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
        info!("Audio output '{}' closed", self.name);
    }
}

fn select_device(host: &Host, device_name: Option<&str>) -> Result<Device> {
    if let Some(name) = device_name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::Device(format!("Failed to enumerate devices: {}", e)))?;

        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            info!("Found requested audio device: {}", name);
            return Ok(device);
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    host.default_output_device()
        .ok_or_else(|| Error::Device("No default output device found".to_string()))
}

/// Get the best supported configuration for playback.
///
/// Prefers 44.1kHz stereo f32, otherwise the device default.
fn best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
    let mut supported = device
        .supported_output_configs()
        .map_err(|e| Error::Device(format!("Failed to get device configs: {}", e)))?;

    let preferred = supported.find(|config| {
        config.channels() == 2
            && config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
            && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
            && config.sample_format() == SampleFormat::F32
    });

    if let Some(config) = preferred {
        let sample_format = config.sample_format();
        let config = config
            .with_sample_rate(cpal::SampleRate(PREFERRED_SAMPLE_RATE))
            .config();
        return Ok((config, sample_format));
    }

    let config = device
        .default_output_config()
        .map_err(|e| Error::Device(format!("Failed to get default config: {}", e)))?;
    let sample_format = config.sample_format();
    Ok((config.config(), sample_format))
}

fn open_stream(
    device_name: Option<&str>,
    mixer: Arc<Mixer>,
    error_count: Arc<AtomicU32>,
) -> Result<(Stream, OutputInfo)> {
    let host = cpal::default_host();
    let device = select_device(&host, device_name)?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let (config, sample_format) = best_config(&device)?;

    debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}",
        config.sample_rate.0, config.channels, sample_format
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer, error_count)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer, error_count)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer, error_count)?,
        other => {
            return Err(Error::Device(format!("Unsupported sample format: {:?}", other)));
        }
    };

    stream
        .play()
        .map_err(|e| Error::Device(format!("Failed to start stream: {}", e)))?;

    let info = OutputInfo {
        name,
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };
    Ok((stream, info))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mixer: Arc<Mixer>,
    error_count: Arc<AtomicU32>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                mixer.mix(&mut scratch, channels, sample_rate);
                for (out, sample) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(*sample);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_count.fetch_add(1, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| Error::Device(format!("Failed to build stream: {}", e)))
}
