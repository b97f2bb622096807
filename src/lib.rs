// Station Announcer - spoken departure announcements for a railway station
//
// Turns schedule records into announcements:
// - LLM text generation (Ollama), cancellable between chunks
// - Number and time normalization for speech
// - Piper speech synthesis, loaded on first use
// - Playback on the default output device, stoppable at any time

// Core modules
pub mod audio;
pub mod cancel;
pub mod config;
pub mod error;
pub mod llm_engine;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod schedule;
pub mod tts_engine;

pub use cancel::{CancelHandle, CancelToken};
pub use config::AnnouncerConfig;
pub use error::{AnnounceError, Result};
pub use normalizer::TextNormalizer;
pub use pipeline::{
    AnnouncementController, AnnouncementPipeline, BatchOutcome, BatchReport, PipelineState,
};
pub use report::{PipelineEvent, ProgressSink, Reporter};
pub use schedule::{load_schedule, parse_schedule, ScheduleRecord};

/// Install env_logger on stderr (reads RUST_LOG, defaults to info)
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
