//! Piper voice backend
//!
//! Runs the `piper` executable once per announcement: text on stdin, raw 16-bit
//! mono PCM on stdout (`--output_raw`). The native rate comes from the model's
//! `.onnx.json` sidecar.

use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::VoiceConfig;
use crate::error::{AnnounceError, Result};
use crate::tts_engine::types::pcm16_to_f32;
use crate::tts_engine::voice::{VoiceLoader, VoiceModel};

/// The parts of the Piper model config we need
#[derive(Debug, Deserialize)]
struct PiperModelConfig {
    audio: PiperAudioConfig,
    #[serde(default)]
    num_speakers: u32,
}

#[derive(Debug, Deserialize)]
struct PiperAudioConfig {
    sample_rate: u32,
}

/// `voice.onnx` → `voice.onnx.json`
fn sidecar_path(model_path: &Path) -> PathBuf {
    let mut path: OsString = model_path.as_os_str().to_owned();
    path.push(".json");
    PathBuf::from(path)
}

fn read_model_config(model_path: &Path) -> Result<PiperModelConfig> {
    let path = sidecar_path(model_path);
    let json = std::fs::read_to_string(&path).map_err(|e| {
        AnnounceError::BackendUnavailable(format!(
            "Cannot read voice config {}: {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&json).map_err(|e| {
        AnnounceError::BackendUnavailable(format!(
            "Invalid voice config {}: {}",
            path.display(),
            e
        ))
    })
}

pub struct PiperLoader {
    config: VoiceConfig,
}

impl PiperLoader {
    pub fn new(config: VoiceConfig) -> Self {
        Self { config }
    }

    /// Make sure the executable can be started at all
    async fn probe_executable(&self) -> Result<()> {
        let status = Command::new(&self.config.piper_path)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                AnnounceError::BackendUnavailable(format!(
                    "Cannot run piper at {}: {}",
                    self.config.piper_path.display(),
                    e
                ))
            })?;
        log::debug!("piper --help exited with {}", status);
        Ok(())
    }
}

#[async_trait]
impl VoiceLoader for PiperLoader {
    fn backend_name(&self) -> &'static str {
        "piper"
    }

    async fn load(&self) -> Result<Arc<dyn VoiceModel>> {
        let model_path = &self.config.model_path;
        if !model_path.is_file() {
            return Err(AnnounceError::BackendUnavailable(format!(
                "Voice model not found: {}",
                model_path.display()
            )));
        }

        let model_config = read_model_config(model_path)?;
        if model_config.audio.sample_rate == 0 {
            return Err(AnnounceError::BackendUnavailable(
                "Voice config has a zero sample rate".to_string(),
            ));
        }

        if let Some(speaker) = self.config.speaker_id {
            if speaker >= model_config.num_speakers.max(1) {
                return Err(AnnounceError::BackendUnavailable(format!(
                    "Speaker {} out of range, model has {} speaker(s)",
                    speaker,
                    model_config.num_speakers.max(1)
                )));
            }
        }

        self.probe_executable().await?;

        log::info!(
            "Piper voice {} ready at {} Hz",
            model_path.display(),
            model_config.audio.sample_rate
        );

        Ok(Arc::new(PiperVoice {
            piper_path: self.config.piper_path.clone(),
            model_path: model_path.clone(),
            speaker_id: self.config.speaker_id,
            sample_rate: model_config.audio.sample_rate,
        }))
    }
}

pub struct PiperVoice {
    piper_path: PathBuf,
    model_path: PathBuf,
    speaker_id: Option<u32>,
    sample_rate: u32,
}

#[async_trait]
impl VoiceModel for PiperVoice {
    fn native_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn render(&self, text: &str) -> Result<Vec<f32>> {
        let mut command = Command::new(&self.piper_path);
        command
            .arg("--model")
            .arg(&self.model_path)
            .arg("--output_raw")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(speaker) = self.speaker_id {
            command.arg("--speaker").arg(speaker.to_string());
        }

        let mut child = command
            .spawn()
            .map_err(|e| AnnounceError::SynthesisFailure(format!("Failed to start piper: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AnnounceError::SynthesisFailure("piper stdin unavailable".to_string()))?;

        // One line per utterance; newlines inside the text would split it
        let input = format!("{}\n", text.replace('\n', " ").trim());
        let writer = tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AnnounceError::SynthesisFailure(format!("piper did not finish: {}", e)))?;

        writer
            .await
            .map_err(|e| AnnounceError::SynthesisFailure(format!("piper input task failed: {}", e)))?
            .map_err(|e| AnnounceError::SynthesisFailure(format!("Failed to write to piper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnnounceError::SynthesisFailure(format!(
                "piper exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let samples = pcm16_to_f32(&output.stdout);
        log::debug!(
            "piper rendered {} samples for {} chars",
            samples.len(),
            text.len()
        );
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice_config(dir: &Path, piper: &str) -> VoiceConfig {
        VoiceConfig {
            piper_path: PathBuf::from(piper),
            model_path: dir.join("en_US-ryan-medium.onnx"),
            speaker_id: None,
        }
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/voices/en_US-ryan-medium.onnx")),
            PathBuf::from("/voices/en_US-ryan-medium.onnx.json")
        );
    }

    #[test]
    fn test_reads_sample_rate_from_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("voice.onnx");
        std::fs::write(
            sidecar_path(&model),
            r#"{"audio": {"sample_rate": 22050, "quality": "medium"}, "num_speakers": 1, "espeak": {"voice": "en-us"}}"#,
        )
        .unwrap();

        let config = read_model_config(&model).unwrap();
        assert_eq!(config.audio.sample_rate, 22_050);
        assert_eq!(config.num_speakers, 1);
    }

    #[tokio::test]
    async fn test_missing_model_is_backend_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let loader = PiperLoader::new(voice_config(dir.path(), "piper"));

        let result = loader.load().await;
        assert!(matches!(result, Err(AnnounceError::BackendUnavailable(msg)) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn test_missing_executable_is_backend_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = voice_config(dir.path(), "/nonexistent/bin/piper");
        std::fs::write(&config.model_path, b"onnx").unwrap();
        std::fs::write(
            sidecar_path(&config.model_path),
            r#"{"audio": {"sample_rate": 22050}}"#,
        )
        .unwrap();

        let result = PiperLoader::new(config).load().await;
        assert!(matches!(result, Err(AnnounceError::BackendUnavailable(msg)) if msg.contains("Cannot run piper")));
    }

    #[tokio::test]
    async fn test_speaker_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = voice_config(dir.path(), "piper");
        config.speaker_id = Some(4);
        std::fs::write(&config.model_path, b"onnx").unwrap();
        std::fs::write(
            sidecar_path(&config.model_path),
            r#"{"audio": {"sample_rate": 22050}, "num_speakers": 2}"#,
        )
        .unwrap();

        let result = PiperLoader::new(config).load().await;
        assert!(matches!(result, Err(AnnounceError::BackendUnavailable(msg)) if msg.contains("Speaker 4")));
    }
}
