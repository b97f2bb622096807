//! Error types shared across the announcement pipeline
//!
//! Only configuration and input errors ever reach the caller of a batch. Backend
//! failures are recovered inside the pipeline (fallback text, skipped playback) and
//! cooperative cancellation is an outcome, not an error.

use thiserror::Error;

use crate::llm_engine::provider::LlmError;

#[derive(Debug, Error)]
pub enum AnnounceError {
    /// Generator or synthesizer backend could not be loaded or reached
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Voice backend was loaded but failed to render the text
    #[error("Synthesis failed: {0}")]
    SynthesisFailure(String),

    /// Output device missing or the stream broke
    #[error("Playback failed: {0}")]
    PlaybackFailure(String),

    /// A second `play` was issued while one is still active on the same player
    #[error("Player is already playing")]
    PlaybackBusy,

    /// Schedule record is missing a required field
    #[error("Invalid schedule record: {0}")]
    InvalidRecord(String),

    /// The controller was asked to start while a batch is still running
    #[error("An announcement batch is already in progress")]
    BatchInProgress,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<LlmError> for AnnounceError {
    fn from(err: LlmError) -> Self {
        AnnounceError::BackendUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnnounceError>;
