//! Announcement pipeline: per-record state machine, batch orchestration and control

pub mod controller;
pub mod orchestrator;
pub mod state;

pub use controller::AnnouncementController;
pub use orchestrator::AnnouncementPipeline;
pub use state::{BatchOutcome, BatchReport, PipelineState, RecordReport};
