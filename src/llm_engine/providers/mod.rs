//! LLM Provider implementations
//!
//! Each provider implements the ChatProvider trait for a specific backend

pub mod ollama_provider;

pub use ollama_provider::OllamaProvider;
