//! Sound file decoder using symphonia
//!
//! Decodes a whole WAV file into interleaved f32 samples. Alarm sounds are
//! short, so the entire file is held in memory for the lifetime of the asset.

use crate::audio::types::{SoundBuffer, WaveFormat};
use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decode an entire sound file to PCM samples.
///
/// # Errors
/// [`Error::AssetLoad`] when the file cannot be opened, probed, or has no
/// decodable audio track.
pub fn decode_file(path: &Path) -> Result<SoundBuffer> {
    debug!("Decoding sound file: {}", path.display());

    let file = File::open(path).map_err(|e| Error::asset_load(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::asset_load(path, format!("failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::asset_load(path, "no audio track found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| Error::asset_load(path, "sample rate not found"))?;

    let channels = codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| Error::asset_load(path, "channel count not found"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::asset_load(path, format!("failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!("Error reading packet from {}: {}", path.display(), e);
                break;
            }
        };

        // Skip packets for other tracks
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Decode error in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(Error::asset_load(path, e)),
        }
    }

    if samples.is_empty() {
        return Err(Error::asset_load(path, "file contains no audio"));
    }

    debug!(
        "Decoded {}: {} Hz, {} channels, {} frames",
        path.display(),
        sample_rate,
        channels,
        samples.len() / channels.max(1) as usize
    );

    Ok(SoundBuffer::new(samples, WaveFormat::new(sample_rate, channels)))
}
