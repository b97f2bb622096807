//! Announcer configuration
//!
//! Everything has a default so the binary runs against a local Ollama and Piper
//! install without a config file. Values come from JSON, then environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AnnounceError, Result};

/// Ollama server settings for the text generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Connect timeout only; a streaming generation is never cut off by a deadline
    pub connect_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b-instruct".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// Piper voice settings for the synthesizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Piper executable, resolved through PATH when relative
    pub piper_path: PathBuf,
    /// `.onnx` voice model; its `.onnx.json` sidecar must sit next to it
    pub model_path: PathBuf,
    /// Speaker for multi-speaker models, fixed for the process lifetime
    pub speaker_id: Option<u32>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            piper_path: PathBuf::from("piper"),
            model_path: default_data_dir().join("voices").join("en_US-ryan-medium.onnx"),
            speaker_id: None,
        }
    }
}

/// Sampling parameters sent with every generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How many records from the head of the schedule one batch announces
    pub batch_size: usize,
    /// Pause between two announcements
    pub gap_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            gap_ms: 1000,
        }
    }
}

impl PipelineConfig {
    pub fn gap(&self) -> Duration {
        Duration::from_millis(self.gap_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncerConfig {
    pub ollama: OllamaConfig,
    pub voice: VoiceConfig,
    pub generation: GenerationConfig,
    pub pipeline: PipelineConfig,
}

impl AnnouncerConfig {
    /// Load from an explicit path, or from the default location if it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    log::info!(
                        "No config at {}, using defaults",
                        default_path.display()
                    );
                    Self::default()
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AnnounceError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ANNOUNCER_OLLAMA_URL") {
            self.ollama.base_url = url;
        }
        if let Ok(model) = std::env::var("ANNOUNCER_OLLAMA_MODEL") {
            self.ollama.model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.batch_size == 0 {
            return Err(AnnounceError::Config(
                "pipeline.batch_size must be at least 1".to_string(),
            ));
        }
        let temperature = self.generation.temperature;
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(AnnounceError::Config(format!(
                "generation.temperature must be a non-negative number, got {}",
                temperature
            )));
        }
        if self.ollama.model.trim().is_empty() {
            return Err(AnnounceError::Config("ollama.model is empty".to_string()));
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("station-announcer")
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("station-announcer")
        .join("config.json")
}
