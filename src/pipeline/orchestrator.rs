//! Announcement pipeline
//!
//! Runs the head of the schedule through generator → normalizer → synthesizer →
//! player, one record at a time, under a shared cancel token. Backend failures
//! degrade a single record; only a stop request ends the batch early.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::audio::player::{DevicePlayer, PlaybackOutcome, Player};
use crate::cancel::CancelToken;
use crate::config::{AnnouncerConfig, GenerationConfig, PipelineConfig};
use crate::error::{AnnounceError, Result};
use crate::llm_engine::generator::{
    AnnouncementGenerator, GenerationOutcome, GenerationRequest, StreamingGenerator,
};
use crate::llm_engine::providers::OllamaProvider;
use crate::normalizer::TextNormalizer;
use crate::pipeline::state::{BatchOutcome, BatchReport, PipelineState, RecordReport};
use crate::report::{PipelineEvent, Reporter};
use crate::schedule::ScheduleRecord;
use crate::tts_engine::{PiperLoader, SpeechSynthesizer, Synthesizer};

/// How a single record left the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordStep {
    Played,
    /// Text was shown but nothing was heard
    Skipped,
    Stopped,
}

pub struct AnnouncementPipeline {
    generator: Arc<dyn AnnouncementGenerator>,
    normalizer: TextNormalizer,
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn Player>,
    generation: GenerationConfig,
    settings: PipelineConfig,
    reporter: Reporter,
}

impl AnnouncementPipeline {
    pub fn new(
        generator: Arc<dyn AnnouncementGenerator>,
        synthesizer: Arc<dyn Synthesizer>,
        player: Arc<dyn Player>,
        generation: GenerationConfig,
        settings: PipelineConfig,
    ) -> Self {
        Self {
            generator,
            normalizer: TextNormalizer::new(),
            synthesizer,
            player,
            generation,
            settings,
            reporter: Reporter::silent(),
        }
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter.scoped("pipeline");
        self
    }

    /// Production wiring: Ollama for text, Piper for speech, default output device.
    /// Nothing is contacted or loaded until the first record needs it.
    pub fn from_config(config: &AnnouncerConfig, reporter: Reporter) -> Result<Self> {
        let provider = OllamaProvider::new(config.ollama.clone())?;
        let generator = StreamingGenerator::new(Arc::new(provider), reporter.clone());
        let synthesizer = SpeechSynthesizer::new(
            Arc::new(PiperLoader::new(config.voice.clone())),
            reporter.clone(),
        );

        Ok(Self::new(
            Arc::new(generator),
            Arc::new(synthesizer),
            Arc::new(DevicePlayer::new()),
            config.generation.clone(),
            config.pipeline.clone(),
        )
        .with_reporter(reporter))
    }

    /// Shared with the controller so a stop can cut playback
    pub fn player(&self) -> Arc<dyn Player> {
        self.player.clone()
    }

    pub fn batch_size(&self) -> usize {
        self.settings.batch_size
    }

    /// Announce the first `batch_size` records in order. Always returns a report
    /// with a terminal outcome.
    pub async fn run(&self, records: &[ScheduleRecord], cancel: &CancelToken) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let batch = &records[..records.len().min(self.settings.batch_size)];
        let total = batch.len();

        log::info!(
            "Batch {} started: {} of {} records",
            batch_id,
            total,
            records.len()
        );

        let mut reports = Vec::with_capacity(total);
        let mut announced = 0;
        let mut stopped_at = None;

        for (index, record) in batch.iter().enumerate() {
            let mut report = RecordReport::new(index, record.identifier.clone());
            let step = self
                .announce_record(index, total, record, cancel, &mut report)
                .await;
            reports.push(report);

            let played = match step {
                RecordStep::Stopped => {
                    stopped_at = Some(index);
                    break;
                }
                RecordStep::Played => {
                    announced += 1;
                    true
                }
                RecordStep::Skipped => false,
            };

            // A stop that lands after playback finished ends the batch at this record
            if cancel.is_cancelled() {
                log::info!("Stop observed after record {}", index);
                stopped_at = Some(index);
                break;
            }

            // Not interruptible once started; a stop is seen at the next record
            if played && index + 1 < total {
                tokio::time::sleep(self.settings.gap()).await;
            }
        }

        let outcome = match stopped_at {
            Some(at_index) => {
                self.reporter.status("Stopped by user");
                BatchOutcome::Stopped {
                    at_index,
                    announced,
                    total,
                }
            }
            None => {
                self.reporter.status("All announcements completed");
                BatchOutcome::Completed { announced, total }
            }
        };

        log::info!("Batch {} finished: {}", batch_id, outcome);
        self.reporter.emit(PipelineEvent::Finished(outcome));

        BatchReport {
            batch_id,
            started_at,
            finished_at: Utc::now(),
            outcome,
            records: reports,
        }
    }

    async fn announce_record(
        &self,
        index: usize,
        total: usize,
        record: &ScheduleRecord,
        cancel: &CancelToken,
        report: &mut RecordReport,
    ) -> RecordStep {
        let position = index + 1;

        if cancel.is_cancelled() {
            return self.stop_record(report);
        }

        self.transition(report, PipelineState::Generating);
        self.reporter
            .status(format!("Generating announcement {}/{}...", position, total));

        let request = GenerationRequest::new(record.clone(), &self.generation);
        let text = match self.generator.generate(&request, cancel).await {
            GenerationOutcome::Generated(text) => text,
            GenerationOutcome::Fallback(text) => {
                report.degraded = true;
                text
            }
            GenerationOutcome::Interrupted => return self.stop_record(report),
        };

        if cancel.is_cancelled() {
            return self.stop_record(report);
        }

        report.text = Some(text.clone());
        self.reporter.emit(PipelineEvent::Announcement {
            index,
            text: text.clone(),
        });

        self.transition(report, PipelineState::Normalizing);
        let normalized = self.normalizer.normalize(&text);

        self.transition(report, PipelineState::Synthesizing);
        self.reporter.status(format!("Speaking {}/{}...", position, total));
        log::debug!("Reading: '{}'", normalized);

        let waveform = match self.synthesizer.synthesize(&normalized).await {
            Ok(waveform) => waveform,
            Err(e) => return self.skip_record(report, e),
        };

        if cancel.is_cancelled() {
            return self.stop_record(report);
        }

        self.transition(report, PipelineState::Playing);
        match self.player.play(waveform, true).await {
            Ok(PlaybackOutcome::Played) | Ok(PlaybackOutcome::Started) => {
                report.spoken = true;
                self.transition(report, PipelineState::Completed);
                RecordStep::Played
            }
            Ok(PlaybackOutcome::Interrupted) if cancel.is_cancelled() => self.stop_record(report),
            Ok(PlaybackOutcome::Interrupted) => self.skip_record(
                report,
                AnnounceError::PlaybackFailure("playback interrupted".to_string()),
            ),
            Err(e) => self.skip_record(report, e),
        }
    }

    fn transition(&self, report: &mut RecordReport, state: PipelineState) {
        if report.advance(state) {
            self.reporter.emit(PipelineEvent::StateChanged {
                index: report.index,
                state,
            });
        }
    }

    fn stop_record(&self, report: &mut RecordReport) -> RecordStep {
        log::info!("Stop observed at record {}", report.index);
        self.transition(report, PipelineState::Stopped);
        RecordStep::Stopped
    }

    fn skip_record(&self, report: &mut RecordReport, error: AnnounceError) -> RecordStep {
        log::warn!(
            "Skipping playback for record {} ({}): {}",
            report.index,
            report.identifier,
            error
        );
        self.reporter.status(format!("Cannot speak announcement: {}", error));
        report.skipped = Some(error.to_string());
        self.transition(report, PipelineState::Completed);
        RecordStep::Skipped
    }
}
