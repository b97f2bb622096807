//! LLM engine for announcement text
//!
//! - `provider`: the streaming chat backend trait
//! - `providers`: the Ollama implementation
//! - `prompt`: system prompt, per-record user prompt and fallback wording
//! - `generator`: cancellable generation on top of a provider

pub mod generator;
pub mod prompt;
pub mod provider;
pub mod providers;

pub use generator::{
    AnnouncementGenerator, GenerationOutcome, GenerationRequest, StreamingGenerator,
};
pub use provider::{
    ChatProvider, ChunkStream, CompletionRequest, LlmError, Message, MessageRole, TextChunk,
};
