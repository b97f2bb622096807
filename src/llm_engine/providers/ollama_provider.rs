//! Ollama API provider
//!
//! Connects to a running Ollama server (default: localhost:11434) and streams
//! `/api/chat` responses as NDJSON, one JSON object per line.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::OllamaConfig;
use crate::llm_engine::provider::{
    ChatProvider, ChunkStream, CompletionRequest, LlmError, Message, MessageRole, TextChunk,
};

/// Ollama API message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: match msg.role {
                MessageRole::System => "system".to_string(),
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: msg.content.clone(),
        }
    }
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// One line of a streamed chat response
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u32>,
    /// Set instead of `message` when the server fails mid-generation
    #[serde(default)]
    error: Option<String>,
}

/// Ollama model list response
#[derive(Debug, Deserialize)]
struct OllamaModelList {
    models: Vec<OllamaModelEntry>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelEntry {
    name: String,
}

/// Ollama version response
#[derive(Debug, Deserialize)]
struct OllamaVersion {
    version: String,
}

/// Ollama LLM provider
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
    current_model: RwLock<Option<String>>,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                LlmError::ProviderUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            client,
            current_model: RwLock::new(None),
        })
    }

    /// Check if Ollama server is running
    pub async fn check_connection(&self) -> Result<String, LlmError> {
        let url = format!("{}/api/version", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::ProviderUnavailable(format!("Cannot connect to Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(LlmError::ProviderUnavailable(
                "Ollama server returned error".to_string(),
            ));
        }

        let version: OllamaVersion = response
            .json()
            .await
            .map_err(|e| LlmError::ProviderUnavailable(format!("Invalid response: {}", e)))?;

        Ok(version.version)
    }

    /// Names of the models installed on the server
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::ProviderUnavailable(format!("Cannot connect to Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(LlmError::RequestFailed(
                "Failed to list Ollama models".to_string(),
            ));
        }

        let model_list: OllamaModelList = response
            .json()
            .await
            .map_err(|e| LlmError::RequestFailed(format!("Invalid response: {}", e)))?;

        Ok(model_list.models.into_iter().map(|m| m.name).collect())
    }
}

/// Untagged names resolve to `:latest`, the way the Ollama CLI does
fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted || (!wanted.contains(':') && installed == format!("{}:latest", wanted))
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    async fn initialize(&self) -> Result<(), LlmError> {
        let version = self.check_connection().await?;
        log::info!("Connected to Ollama {} at {}", version, self.config.base_url);

        let wanted = &self.config.model;
        let models = self.list_models().await?;
        let Some(model) = models.iter().find(|m| model_matches(m, wanted)) else {
            return Err(LlmError::ModelNotFound(format!(
                "Model '{}' not found in Ollama. Available models: {:?}",
                wanted, models
            )));
        };

        *self.current_model.write().await = Some(model.clone());

        log::info!("Ollama provider initialized with model: {}", model);
        Ok(())
    }

    async fn stream_chat(&self, request: CompletionRequest) -> Result<ChunkStream, LlmError> {
        let model = self
            .current_model
            .read()
            .await
            .clone()
            .ok_or(LlmError::NotInitialized)?;

        let url = format!("{}/api/chat", self.config.base_url);

        let ollama_request = OllamaChatRequest {
            model,
            messages: request.messages.iter().map(OllamaMessage::from).collect(),
            stream: true,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed(format!(
                "Ollama returned error: {}",
                error_text
            )));
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| LlmError::RequestFailed(format!("Stream error: {}", e)))
        });

        Ok(chunk_stream(body))
    }
}

/// Splits a byte stream into NDJSON lines and turns each line into a chunk.
/// Network reads may cut a line anywhere, so partial lines wait in `buffer`.
#[derive(Debug, Default)]
struct NdjsonChunker {
    buffer: Vec<u8>,
    pending: VecDeque<Result<TextChunk, LlmError>>,
    finished: bool,
}

impl NdjsonChunker {
    fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.parse_line(&line);
        }
    }

    /// Body ended; whatever is left is the last line
    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.parse_line(&line);
        }
    }

    fn parse_line(&mut self, line: &[u8]) {
        if self.finished {
            return;
        }

        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match serde_json::from_str::<OllamaChatResponse>(text) {
            Ok(resp) => {
                if let Some(error) = resp.error {
                    self.pending.push_back(Err(LlmError::InferenceFailed(error)));
                    self.finished = true;
                    return;
                }
                if let Some(message) = resp.message {
                    if !message.content.is_empty() {
                        self.pending.push_back(Ok(TextChunk::new(message.content)));
                    }
                }
                if resp.done {
                    log::debug!("Ollama stream done ({:?} tokens)", resp.eval_count);
                    self.finished = true;
                }
            }
            Err(e) => log::warn!("Skipping malformed Ollama stream line: {}", e),
        }
    }

    fn next_chunk(&mut self) -> Option<Result<TextChunk, LlmError>> {
        self.pending.pop_front()
    }
}

struct StreamState {
    body: BoxStream<'static, Result<Vec<u8>, LlmError>>,
    chunker: NdjsonChunker,
    body_done: bool,
}

/// Reads the body only as far as the consumer pulls chunks
fn chunk_stream<S>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<Vec<u8>, LlmError>> + Send + 'static,
{
    let state = StreamState {
        body: body.boxed(),
        chunker: NdjsonChunker::default(),
        body_done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.chunker.next_chunk() {
                return Some((item, state));
            }
            if state.chunker.finished || state.body_done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => state.chunker.feed(&bytes),
                Some(Err(e)) => {
                    state.body_done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.body_done = true;
                    state.chunker.flush();
                }
            }
        }
    })
    .boxed()
}
