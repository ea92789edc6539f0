//! Sound asset catalog
//!
//! Loads every `.wav` file in the sound folder into a named asset with its
//! own voice. The asset name is the file stem, so `approach_a_loop.wav` is
//! looked up as `approach_a_loop`.
//!
//! Voices are released exactly once: when the catalog is cleared, reloaded,
//! or dropped, and when a replaced asset is discarded.

use crate::audio::decoder::decode_file;
use crate::audio::types::{SoundBuffer, WaveFormat};
use crate::audio::voice::{AudioDevice, Voice, DEFAULT_MAX_FREQUENCY_RATIO};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extension of loadable sound files (case-insensitive)
pub const SOUND_FILE_EXTENSION: &str = "wav";

/// A loaded sound bound to its playback voice
pub struct SoundAsset {
    name: String,
    path: PathBuf,
    pub(crate) buffer: SoundBuffer,
    pub(crate) voice: Box<dyn Voice>,
    /// Per-asset volume before master scaling
    pub(crate) volume: f32,
    pub(crate) pitch: f32,
}

impl SoundAsset {
    fn new(sound: DecodedSound, device: &dyn AudioDevice) -> Result<Self> {
        let voice = device.create_voice(sound.buffer.format(), DEFAULT_MAX_FREQUENCY_RATIO)?;

        Ok(Self {
            name: sound.name,
            path: sound.path,
            buffer: sound.buffer,
            voice,
            volume: 1.0,
            pitch: 1.0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> WaveFormat {
        self.buffer.format()
    }

    pub fn buffer(&self) -> &SoundBuffer {
        &self.buffer
    }

    pub fn voice(&self) -> &dyn Voice {
        self.voice.as_ref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn loop_count(&self) -> u32 {
        self.buffer.loop_count
    }

    /// Whether the voice still has audio queued
    pub fn is_playing(&self) -> bool {
        self.voice.buffers_queued() > 0
    }
}

impl Drop for SoundAsset {
    fn drop(&mut self) {
        self.voice.stop();
        self.voice.destroy();
    }
}

/// A sound file decoded from disk, not yet bound to a voice
#[derive(Debug)]
pub struct DecodedSound {
    pub name: String,
    pub path: PathBuf,
    pub buffer: SoundBuffer,
}

impl DecodedSound {
    fn decode(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| Error::asset_load(path, "file has no name"))?;

        Ok(Self {
            name,
            path: path.to_path_buf(),
            buffer: decode_file(path)?,
        })
    }
}

/// Every sound file of a folder, decoded
#[derive(Debug)]
pub struct DecodedFolder {
    pub folder: PathBuf,
    pub sounds: Vec<DecodedSound>,
    /// Files that could not be opened or decoded
    pub failures: Vec<Error>,
}

/// Decode every sound file in `folder`, in sorted path order.
///
/// Touches no voices, so it can run without holding any playback lock.
///
/// # Errors
/// [`Error::AssetLoad`] when the folder itself cannot be read.
pub fn decode_folder(folder: &Path) -> Result<DecodedFolder> {
    let entries = std::fs::read_dir(folder).map_err(|e| Error::asset_load(folder, e))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_sound_file(path))
        .collect();
    paths.sort();

    let mut sounds = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        match DecodedSound::decode(&path) {
            Ok(sound) => {
                debug!("Decoded sound '{}' ({} ms)", sound.name, sound.buffer.duration_ms());
                sounds.push(sound);
            }
            Err(e) => {
                warn!("Skipping sound file: {}", e);
                failures.push(e);
            }
        }
    }

    Ok(DecodedFolder {
        folder: folder.to_path_buf(),
        sounds,
        failures,
    })
}

/// Outcome of a catalog load
#[derive(Debug)]
pub struct LoadReport {
    pub folder: PathBuf,
    /// Assets registered by this load
    pub loaded: usize,
    /// Assets released before loading
    pub released: usize,
    /// Files that were skipped, with the reason
    pub failures: Vec<Error>,
}

/// Mapping of asset name to loaded sound
#[derive(Default)]
pub struct AssetCatalog {
    assets: HashMap<String, SoundAsset>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog contents with every sound file in `folder`.
    ///
    /// Existing voices are released first. Files that fail to open or decode
    /// are skipped and reported in [`LoadReport::failures`].
    ///
    /// # Errors
    /// [`Error::AssetLoad`] when the folder itself cannot be read; the
    /// catalog is left empty.
    pub fn load(&mut self, folder: &Path, device: &dyn AudioDevice) -> Result<LoadReport> {
        match decode_folder(folder) {
            Ok(decoded) => Ok(self.install(decoded, device)),
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// Release every current voice, then bind each decoded sound to a new one.
    ///
    /// A sound whose voice cannot be created is skipped and reported.
    pub fn install(&mut self, decoded: DecodedFolder, device: &dyn AudioDevice) -> LoadReport {
        let released = self.clear();
        let DecodedFolder {
            folder,
            sounds,
            mut failures,
        } = decoded;

        for sound in sounds {
            let path = sound.path.clone();
            match SoundAsset::new(sound, device) {
                Ok(asset) => {
                    if let Some(previous) = self.assets.insert(asset.name.clone(), asset) {
                        warn!(
                            "Sound '{}' from {} replaced by a later file",
                            previous.name(),
                            previous.path().display()
                        );
                    }
                }
                Err(e) => {
                    warn!("No voice for {}: {}", path.display(), e);
                    failures.push(e);
                }
            }
        }

        info!(
            "Loaded {} sounds from {} on '{}' ({} skipped)",
            self.assets.len(),
            folder.display(),
            device.name(),
            failures.len()
        );

        LoadReport {
            folder,
            loaded: self.assets.len(),
            released,
            failures,
        }
    }

    /// Stop and release every voice and buffer.
    ///
    /// Returns the number of assets released.
    pub fn clear(&mut self) -> usize {
        let count = self.assets.len();
        // Dropping an asset stops and destroys its voice
        self.assets.clear();
        if count > 0 {
            debug!("Released {} sounds", count);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SoundAsset> {
        self.assets.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SoundAsset> {
        self.assets.get_mut(name)
    }

    /// Asset names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.assets.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn assets_mut(&mut self) -> impl Iterator<Item = &mut SoundAsset> {
        self.assets.values_mut()
    }
}

fn is_sound_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(SOUND_FILE_EXTENSION))
        .unwrap_or(false)
}
