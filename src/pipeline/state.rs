//! Pipeline states and batch results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where one record is in the pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Generating,
    Normalizing,
    Synthesizing,
    Playing,
    Stopped,
    Completed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Stopped | PipelineState::Completed)
    }

    /// Forward moves only; `Stopped` is reachable from any non-terminal state.
    /// Synthesizing may jump to Completed when playback is skipped.
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == PipelineState::Stopped {
            return true;
        }
        next > self && next != PipelineState::Idle
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Generating => "generating",
            PipelineState::Normalizing => "normalizing",
            PipelineState::Synthesizing => "synthesizing",
            PipelineState::Playing => "playing",
            PipelineState::Stopped => "stopped",
            PipelineState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// How a batch ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed { announced: usize, total: usize },
    /// `at_index` is the zero-based record that was in flight when the stop was seen
    Stopped {
        at_index: usize,
        announced: usize,
        total: usize,
    },
}

impl BatchOutcome {
    pub fn announced(&self) -> usize {
        match self {
            BatchOutcome::Completed { announced, .. } | BatchOutcome::Stopped { announced, .. } => {
                *announced
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, BatchOutcome::Stopped { .. })
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::Completed { announced, total } => {
                write!(f, "Completed {} of {}", announced, total)
            }
            BatchOutcome::Stopped {
                at_index,
                announced,
                total,
            } => write!(
                f,
                "Stopped at index {} ({} of {} announced)",
                at_index, announced, total
            ),
        }
    }
}

/// What happened to one record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordReport {
    pub index: usize,
    pub identifier: String,
    /// Text shown to the operator, if generation finished
    pub text: Option<String>,
    /// Generator used the fallback sentence
    pub degraded: bool,
    /// Playback ran to the end
    pub spoken: bool,
    /// Why playback did not happen, when it was skipped
    pub skipped: Option<String>,
    pub state: PipelineState,
}

impl RecordReport {
    pub fn new(index: usize, identifier: impl Into<String>) -> Self {
        Self {
            index,
            identifier: identifier.into(),
            text: None,
            degraded: false,
            spoken: false,
            skipped: None,
            state: PipelineState::Idle,
        }
    }

    /// Move to `next`. Backwards moves are ignored and logged.
    pub fn advance(&mut self, next: PipelineState) -> bool {
        if !self.state.can_advance_to(next) {
            log::warn!(
                "Ignoring transition {} -> {} for record {}",
                self.state,
                next,
                self.index
            );
            return false;
        }
        self.state = next;
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: BatchOutcome,
    pub records: Vec<RecordReport>,
}

impl BatchReport {
    pub fn announced(&self) -> usize {
        self.outcome.announced()
    }
}
