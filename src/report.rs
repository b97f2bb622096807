//! Progress reporting towards the operator UI
//!
//! Components never talk to the UI directly. They hold a [`Reporter`], which logs
//! every status line and forwards events to an optional sink callback.

use std::sync::Arc;

use crate::pipeline::state::{BatchOutcome, PipelineState};

/// Event delivered to the reporting sink
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Free-text status line ("Thinking...", error detail, batch progress)
    Status(String),
    /// A record moved to a new pipeline state
    StateChanged { index: usize, state: PipelineState },
    /// Announcement text ready for display
    Announcement { index: usize, text: String },
    /// Batch reached a terminal state
    Finished(BatchOutcome),
}

/// Callback for pipeline events
pub type ProgressSink = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

#[derive(Clone)]
pub struct Reporter {
    sink: Option<ProgressSink>,
    source: &'static str,
}

impl Reporter {
    pub fn new(sink: ProgressSink) -> Self {
        Self {
            sink: Some(sink),
            source: "pipeline",
        }
    }

    /// Reporter that only logs
    pub fn silent() -> Self {
        Self {
            sink: None,
            source: "pipeline",
        }
    }

    /// Same sink, different log prefix
    pub fn scoped(&self, source: &'static str) -> Self {
        Self {
            sink: self.sink.clone(),
            source,
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("[{}] {}", self.source, message);
        self.emit(PipelineEvent::Status(message));
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(sink) = &self.sink {
            sink(event);
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::silent()
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("source", &self.source)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn collecting_reporter() -> (Reporter, Arc<std::sync::Mutex<Vec<PipelineEvent>>>) {
    let events = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let reporter = Reporter::new(Arc::new(move |event| {
        sink_events.lock().unwrap().push(event);
    }));
    (reporter, events)
}
