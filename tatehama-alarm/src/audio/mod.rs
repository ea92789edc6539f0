//! Audio decoding, voices and output devices

pub mod decoder;
pub mod headless;
pub mod mixer;
pub mod output;
pub mod types;
pub mod voice;

pub use decoder::decode_file;
pub use headless::HeadlessDevice;
pub use mixer::{Mixer, MixerVoice};
pub use output::CpalDevice;
pub use types::{SoundBuffer, WaveFormat, LOOP_INFINITE};
pub use voice::{AudioDevice, Voice, DEFAULT_MAX_FREQUENCY_RATIO};
