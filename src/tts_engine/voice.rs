//! Voice backend seam
//!
//! A [`VoiceLoader`] does the expensive one-time setup and hands back a
//! [`VoiceModel`] that renders text. The synthesizer keeps the model for the
//! process lifetime, so voice identity and native rate never change.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

#[async_trait]
pub trait VoiceLoader: Send + Sync {
    /// Backend name for logs (e.g., "piper")
    fn backend_name(&self) -> &'static str;

    async fn load(&self) -> Result<Arc<dyn VoiceModel>>;
}

#[async_trait]
pub trait VoiceModel: Send + Sync {
    /// Rate of the samples `render` returns
    fn native_sample_rate(&self) -> u32;

    /// Mono samples at the native rate
    async fn render(&self, text: &str) -> Result<Vec<f32>>;
}
