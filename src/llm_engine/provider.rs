//! Chat provider trait and types
//!
//! Defines the interface the announcement generator streams text from. One production
//! provider (Ollama) implements it; tests plug in scripted providers.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error types for LLM operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LlmError {
    /// Model not installed on the backend
    ModelNotFound(String),
    /// Provider not available (e.g., Ollama not running)
    ProviderUnavailable(String),
    /// Request failed (network, bad status, broken stream)
    RequestFailed(String),
    /// Backend reported an error while generating
    InferenceFailed(String),
    /// Provider not initialized
    NotInitialized,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ModelNotFound(msg) => write!(f, "Model not found: {}", msg),
            LlmError::ProviderUnavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            LlmError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            LlmError::InferenceFailed(msg) => write!(f, "Inference failed: {}", msg),
            LlmError::NotInitialized => write!(f, "Provider not initialized"),
        }
    }
}

impl std::error::Error for LlmError {}

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request for a streamed chat completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,
}

/// One increment of generated text, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
}

impl TextChunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Lazy, finite, non-restartable sequence of chunks. Dropping it abandons the generation.
pub type ChunkStream = BoxStream<'static, Result<TextChunk, LlmError>>;

/// The trait all chat backends implement
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logs (e.g., "ollama")
    fn provider_name(&self) -> &'static str;

    /// Make the configured model ready. The generator calls this at most once on success.
    async fn initialize(&self) -> Result<(), LlmError>;

    /// Start a completion; chunks are produced only as the stream is polled
    async fn stream_chat(&self, request: CompletionRequest) -> Result<ChunkStream, LlmError>;
}
