//! Control side of the announcer
//!
//! Owns the cancel handle and the worker task. The operator surface (CLI, UI)
//! talks only to this type: start a batch, stop it, collect the report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::audio::player::Player;
use crate::cancel::CancelHandle;
use crate::error::{AnnounceError, Result};
use crate::pipeline::orchestrator::AnnouncementPipeline;
use crate::pipeline::state::BatchReport;
use crate::report::Reporter;
use crate::schedule::ScheduleRecord;

/// Clears the running flag when the worker ends, even by panic
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AnnouncementController {
    pipeline: Arc<AnnouncementPipeline>,
    player: Arc<dyn Player>,
    cancel: CancelHandle,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<BatchReport>>>,
    reporter: Reporter,
}

impl AnnouncementController {
    pub fn new(pipeline: AnnouncementPipeline, reporter: Reporter) -> Self {
        let player = pipeline.player();
        Self {
            pipeline: Arc::new(pipeline),
            player,
            cancel: CancelHandle::new(),
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
            reporter: reporter.scoped("controller"),
        }
    }

    /// Spawn a batch over `records`. Fails with `BatchInProgress` while one runs.
    pub async fn start(&self, records: Vec<ScheduleRecord>) -> Result<()> {
        for record in &records {
            record.validate()?;
        }

        let mut task = self.task.lock().await;
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AnnounceError::BatchInProgress);
        }

        if task.take().is_some() {
            log::debug!("Discarding report of a batch nobody waited for");
        }

        self.cancel.reset();

        let pipeline = self.pipeline.clone();
        let token = self.cancel.token();
        let guard = RunningGuard(self.running.clone());
        *task = Some(tokio::spawn(async move {
            let _guard = guard;
            pipeline.run(&records, &token).await
        }));

        log::info!("Announcement batch started");
        Ok(())
    }

    /// Set the stop flag and cut the current playback. Safe to call at any time.
    pub fn stop(&self) {
        let was_running = self.is_running();
        self.cancel.cancel();
        self.player.stop();
        if was_running {
            self.reporter.status("STOPPING...");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait for the last started batch. `None` if there is none or it panicked.
    pub async fn wait(&self) -> Option<BatchReport> {
        let handle = self.task.lock().await.take()?;
        match handle.await {
            Ok(report) => Some(report),
            Err(e) => {
                log::error!("Announcement task failed: {}", e);
                None
            }
        }
    }

    /// Stop and collect, for the close path
    pub async fn shutdown(&self) -> Option<BatchReport> {
        self.stop();
        self.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::config::GenerationConfig;
    use crate::llm_engine::generator::{
        AnnouncementGenerator, GenerationOutcome, GenerationRequest,
    };
    use crate::pipeline::orchestrator::tests::{
        fast_settings, schedule, FakeSynthesizer, RecordingPlayer, ScriptedGenerator,
    };
    use crate::pipeline::state::BatchOutcome;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Streams forever until stopped
    struct EndlessGenerator;

    #[async_trait]
    impl AnnouncementGenerator for EndlessGenerator {
        async fn generate(
            &self,
            _request: &GenerationRequest,
            cancel: &CancelToken,
        ) -> GenerationOutcome {
            loop {
                if cancel.is_cancelled() {
                    return GenerationOutcome::Interrupted;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
    }

    fn controller(
        generator: Arc<dyn AnnouncementGenerator>,
        player: Arc<RecordingPlayer>,
    ) -> AnnouncementController {
        let pipeline = AnnouncementPipeline::new(
            generator,
            Arc::new(FakeSynthesizer::default()),
            player,
            GenerationConfig::default(),
            fast_settings(3),
        );
        AnnouncementController::new(pipeline, Reporter::silent())
    }

    #[tokio::test]
    async fn test_runs_batch_to_completion() {
        let controller = controller(
            Arc::new(ScriptedGenerator::default()),
            Arc::new(RecordingPlayer::default()),
        );

        controller.start(schedule(4)).await.unwrap();
        let report = controller.wait().await.unwrap();

        assert_eq!(
            report.outcome,
            BatchOutcome::Completed {
                announced: 3,
                total: 3
            }
        );
        assert!(!controller.is_running());
        assert!(controller.wait().await.is_none());
    }

    #[tokio::test]
    async fn test_refuses_overlapping_batch() {
        let player = Arc::new(RecordingPlayer::default());
        let controller = controller(Arc::new(EndlessGenerator), player.clone());

        controller.start(schedule(3)).await.unwrap();
        assert!(controller.is_running());
        assert!(matches!(
            controller.start(schedule(3)).await,
            Err(AnnounceError::BatchInProgress)
        ));

        let report = controller.shutdown().await.unwrap();
        assert_eq!(
            report.outcome,
            BatchOutcome::Stopped {
                at_index: 0,
                announced: 0,
                total: 3
            }
        );
        assert!(!controller.is_running());
        assert_eq!(*player.stops.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let controller = controller(
            Arc::new(ScriptedGenerator::default()),
            Arc::new(RecordingPlayer::default()),
        );

        // A stop while idle must not leak into the next batch
        controller.stop();
        controller.start(schedule(2)).await.unwrap();
        let report = controller.wait().await.unwrap();
        assert!(!report.outcome.is_stopped());
        assert_eq!(report.announced(), 2);
    }

    #[tokio::test]
    async fn test_invalid_record_rejected() {
        let controller = controller(
            Arc::new(ScriptedGenerator::default()),
            Arc::new(RecordingPlayer::default()),
        );
        let mut records = schedule(2);
        records[1].destination = String::new();

        assert!(matches!(
            controller.start(records).await,
            Err(AnnounceError::InvalidRecord(_))
        ));
        assert!(!controller.is_running());
    }
}
