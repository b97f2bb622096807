//! Text-to-speech engine
//!
//! `SpeechSynthesizer` owns a lazily loaded voice behind the `VoiceLoader` /
//! `VoiceModel` seam; `piper` is the production backend.

pub mod piper;
pub mod synthesizer;
pub mod types;
pub mod voice;

pub use piper::{PiperLoader, PiperVoice};
pub use synthesizer::{SpeechSynthesizer, Synthesizer};
pub use types::{Waveform, OUTPUT_SAMPLE_RATE, TRAILING_SILENCE_SECS};
pub use voice::{VoiceLoader, VoiceModel};
