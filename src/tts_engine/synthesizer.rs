//! Speech synthesizer with a lazily loaded voice
//!
//! The voice is loaded on the first `synthesize` call. Racing first callers share
//! one load attempt; a failed attempt is not cached and the next call retries.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::audio::resampling::resample;
use crate::error::{AnnounceError, Result};
use crate::report::Reporter;
use crate::tts_engine::types::{Waveform, OUTPUT_SAMPLE_RATE, TRAILING_SILENCE_SECS};
use crate::tts_engine::voice::{VoiceLoader, VoiceModel};

/// Interface the pipeline depends on
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// 48 kHz mono waveform with trailing silence. Errors are
    /// `BackendUnavailable` or `SynthesisFailure`.
    async fn synthesize(&self, text: &str) -> Result<Waveform>;
}

pub struct SpeechSynthesizer {
    loader: Arc<dyn VoiceLoader>,
    voice: OnceCell<Arc<dyn VoiceModel>>,
    reporter: Reporter,
}

impl SpeechSynthesizer {
    pub fn new(loader: Arc<dyn VoiceLoader>, reporter: Reporter) -> Self {
        Self {
            loader,
            voice: OnceCell::new(),
            reporter: reporter.scoped("tts"),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.voice.initialized()
    }

    async fn voice(&self) -> Result<Arc<dyn VoiceModel>> {
        let voice = self
            .voice
            .get_or_try_init(|| async {
                self.reporter.status("Loading TTS voice...");
                let voice = self.loader.load().await.map_err(|e| match e {
                    AnnounceError::BackendUnavailable(_) => e,
                    other => AnnounceError::BackendUnavailable(other.to_string()),
                })?;
                log::info!(
                    "{} voice loaded ({} Hz native)",
                    self.loader.backend_name(),
                    voice.native_sample_rate()
                );
                self.reporter.status("TTS voice loaded");
                Ok::<_, AnnounceError>(voice)
            })
            .await?;

        Ok(voice.clone())
    }
}

#[async_trait]
impl Synthesizer for SpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Waveform> {
        let voice = self.voice().await?;

        let samples = voice.render(text).await.map_err(|e| match e {
            AnnounceError::SynthesisFailure(_) => e,
            other => AnnounceError::SynthesisFailure(other.to_string()),
        })?;

        if samples.is_empty() {
            return Err(AnnounceError::SynthesisFailure(
                "voice produced no audio".to_string(),
            ));
        }

        let native_rate = voice.native_sample_rate();
        let samples = if native_rate == OUTPUT_SAMPLE_RATE {
            samples
        } else {
            tokio::task::spawn_blocking(move || resample(&samples, native_rate, OUTPUT_SAMPLE_RATE))
                .await
                .map_err(|e| AnnounceError::SynthesisFailure(format!("Resampling task failed: {}", e)))?
                .map_err(|e| AnnounceError::SynthesisFailure(format!("Resampling failed: {}", e)))?
        };

        Ok(Waveform::new(samples, OUTPUT_SAMPLE_RATE).with_trailing_silence(TRAILING_SILENCE_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct ToneVoice {
        rate: u32,
        fail_render: bool,
    }

    #[async_trait]
    impl VoiceModel for ToneVoice {
        fn native_sample_rate(&self) -> u32 {
            self.rate
        }

        async fn render(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail_render {
                return Err(AnnounceError::SynthesisFailure("voice crashed".to_string()));
            }
            // 10 ms of audio per character
            Ok(vec![0.25; text.len() * self.rate as usize / 100])
        }
    }

    struct CountingLoader {
        loads: AtomicUsize,
        fail_next: AtomicBool,
        rate: u32,
        fail_render: bool,
    }

    impl CountingLoader {
        fn new(rate: u32) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                fail_next: AtomicBool::new(false),
                rate,
                fail_render: false,
            }
        }
    }

    #[async_trait]
    impl VoiceLoader for CountingLoader {
        fn backend_name(&self) -> &'static str {
            "tone"
        }

        async fn load(&self) -> Result<Arc<dyn VoiceModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            // Long enough for a second caller to arrive while loading
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(AnnounceError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "model missing",
                )));
            }
            Ok(Arc::new(ToneVoice {
                rate: self.rate,
                fail_render: self.fail_render,
            }))
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_use_loads_once() {
        let loader = Arc::new(CountingLoader::new(OUTPUT_SAMPLE_RATE));
        let synth = Arc::new(SpeechSynthesizer::new(loader.clone(), Reporter::silent()));

        let a = {
            let synth = synth.clone();
            tokio::spawn(async move { synth.synthesize("Attention please").await })
        };
        let b = {
            let synth = synth.clone();
            tokio::spawn(async move { synth.synthesize("Platform three").await })
        };
        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(synth.is_loaded());
    }

    #[tokio::test]
    async fn test_output_is_48k_with_silence() {
        let loader = Arc::new(CountingLoader::new(OUTPUT_SAMPLE_RATE));
        let synth = SpeechSynthesizer::new(loader, Reporter::silent());

        let wave = synth.synthesize("abcd").await.unwrap();
        assert_eq!(wave.sample_rate, OUTPUT_SAMPLE_RATE);
        // 4 chars * 480 samples of speech + 0.5 s silence
        assert_eq!(wave.samples.len(), 1920 + 24_000);
        assert_eq!(wave.samples[0], 0.25);
        assert_eq!(*wave.samples.last().unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_native_rate_is_resampled() {
        let loader = Arc::new(CountingLoader::new(22_050));
        let synth = SpeechSynthesizer::new(loader, Reporter::silent());

        // 10 chars * 10 ms at 22.05 kHz, same formula as ToneVoice
        let native = "abcdefghij".len() * 22_050 / 100;
        let wave = synth.synthesize("abcdefghij").await.unwrap();
        assert_eq!(wave.sample_rate, OUTPUT_SAMPLE_RATE);
        let speech = wave.samples.len() - 24_000;
        assert_eq!(speech, (native as f64 * 48_000.0 / 22_050.0).round() as usize);
        assert_eq!(speech, 4_800);
    }

    #[tokio::test]
    async fn test_load_failure_is_backend_unavailable_and_retried() {
        let loader = Arc::new(CountingLoader::new(OUTPUT_SAMPLE_RATE));
        loader.fail_next.store(true, Ordering::SeqCst);
        let synth = SpeechSynthesizer::new(loader.clone(), Reporter::silent());

        let first = synth.synthesize("hello").await;
        assert!(matches!(first, Err(AnnounceError::BackendUnavailable(_))));
        assert!(!synth.is_loaded());

        assert!(synth.synthesize("hello").await.is_ok());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_render_failure() {
        let mut loader = CountingLoader::new(OUTPUT_SAMPLE_RATE);
        loader.fail_render = true;
        let synth = SpeechSynthesizer::new(Arc::new(loader), Reporter::silent());

        let result = synth.synthesize("hello").await;
        assert!(matches!(result, Err(AnnounceError::SynthesisFailure(_))));
    }

    #[tokio::test]
    async fn test_empty_render_is_failure() {
        let loader = Arc::new(CountingLoader::new(OUTPUT_SAMPLE_RATE));
        let synth = SpeechSynthesizer::new(loader, Reporter::silent());

        let result = synth.synthesize("").await;
        assert!(matches!(result, Err(AnnounceError::SynthesisFailure(_))));
    }
}
