//! Streaming announcement generator
//!
//! Pulls chunks from a [`ChatProvider`] and polls the cancel token between pulls.
//! A stop discards everything generated so far; a dead backend yields a fixed
//! fallback sentence instead of failing the batch.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::cancel::CancelToken;
use crate::config::GenerationConfig;
use crate::llm_engine::prompt::{build_messages, fallback_announcement};
use crate::llm_engine::provider::{ChatProvider, CompletionRequest, LlmError};
use crate::report::Reporter;
use crate::schedule::ScheduleRecord;

/// One record plus the sampling parameters for its announcement
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub record: ScheduleRecord,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(record: ScheduleRecord, params: &GenerationConfig) -> Self {
        Self {
            record,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }

    fn to_completion(&self) -> CompletionRequest {
        CompletionRequest {
            messages: build_messages(&self.record),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Result of one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Full text from the backend, trimmed
    Generated(String),
    /// Backend unavailable or failed; fallback sentence
    Fallback(String),
    /// Stop observed before the text was complete. No partial text is kept.
    Interrupted,
}

impl GenerationOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Generated(text) | GenerationOutcome::Fallback(text) => Some(text),
            GenerationOutcome::Interrupted => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, GenerationOutcome::Fallback(_))
    }
}

/// Interface the pipeline depends on
#[async_trait]
pub trait AnnouncementGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest, cancel: &CancelToken) -> GenerationOutcome;
}

pub struct StreamingGenerator {
    provider: Arc<dyn ChatProvider>,
    ready: OnceCell<()>,
    reporter: Reporter,
}

impl StreamingGenerator {
    pub fn new(provider: Arc<dyn ChatProvider>, reporter: Reporter) -> Self {
        Self {
            provider,
            ready: OnceCell::new(),
            reporter: reporter.scoped("llm"),
        }
    }

    /// Initialize the provider on first use. Racing callers wait on the same attempt;
    /// a failed attempt leaves the cell empty so a later call retries.
    async fn ensure_ready(&self) -> Result<(), LlmError> {
        self.ready
            .get_or_try_init(|| async {
                self.reporter.status("Loading LLM model...");
                self.provider.initialize().await?;
                self.reporter.status("LLM loaded");
                Ok::<(), LlmError>(())
            })
            .await
            .map(|_| ())
    }

    fn fallback(&self, request: &GenerationRequest, error: &LlmError) -> GenerationOutcome {
        self.reporter.status(format!("Generation error: {}", error));
        log::warn!(
            "Generator running in degraded mode for train {}: {}",
            request.record.identifier,
            error
        );
        GenerationOutcome::Fallback(fallback_announcement(&request.record))
    }

    fn interrupted(&self) -> GenerationOutcome {
        self.reporter.status("Generation interrupted.");
        GenerationOutcome::Interrupted
    }
}

#[async_trait]
impl AnnouncementGenerator for StreamingGenerator {
    async fn generate(&self, request: &GenerationRequest, cancel: &CancelToken) -> GenerationOutcome {
        if cancel.is_cancelled() {
            return self.interrupted();
        }

        if let Err(e) = self.ensure_ready().await {
            return self.fallback(request, &e);
        }

        if cancel.is_cancelled() {
            return self.interrupted();
        }

        self.reporter.status("Thinking...");

        let mut stream = match self.provider.stream_chat(request.to_completion()).await {
            Ok(stream) => stream,
            Err(e) => return self.fallback(request, &e),
        };

        let mut text = String::new();
        let mut chunks = 0usize;
        loop {
            if cancel.is_cancelled() {
                log::debug!("Discarding {} chunks after stop request", chunks);
                return self.interrupted();
            }

            match stream.next().await {
                Some(Ok(chunk)) => {
                    chunks += 1;
                    text.push_str(&chunk.content);
                }
                Some(Err(e)) => return self.fallback(request, &e),
                None => break,
            }
        }

        let text = text.trim();
        if text.is_empty() {
            return self.fallback(
                request,
                &LlmError::InferenceFailed("model returned no text".to_string()),
            );
        }

        log::debug!(
            "Generated {} chars in {} chunks via {}",
            text.len(),
            chunks,
            self.provider.provider_name()
        );
        GenerationOutcome::Generated(text.to_string())
    }
}
