//! Announcement playback on the default output device
//!
//! cpal streams are not `Send`, so each playback owns a dedicated thread that
//! builds the stream, polls for completion or a stop request, then drops it.
//! The async side only waits on oneshot channels.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::audio::resampling::{expand_to_channels, resample_audio};
use crate::error::{AnnounceError, Result};
use crate::tts_engine::Waveform;

/// Poll interval of the playback thread
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Grace period after the last sample so the device buffer empties
const DRAIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every sample went out
    Played,
    /// `stop()` cut the playback short
    Interrupted,
    /// Non-blocking play: output started, completion is not reported
    Started,
}

#[async_trait]
pub trait Player: Send + Sync {
    /// Start output. With `blocking`, waits until the waveform has played or
    /// `stop()` was called. A second play while one is active is `PlaybackBusy`.
    async fn play(&self, waveform: Waveform, blocking: bool) -> Result<PlaybackOutcome>;

    /// Halt the active playback, if any. No-op while idle.
    fn stop(&self);
}

/// One active playback. The stop flag belongs to the session, so a stop that
/// arrives while idle can never leak into the next playback.
#[derive(Debug, Default)]
pub struct PlaybackSession {
    stop_requested: AtomicBool,
}

impl PlaybackSession {
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

/// Enforces one playback per player and routes `stop()` to it
#[derive(Debug, Clone, Default)]
pub struct PlaybackSlot {
    current: Arc<Mutex<Option<Arc<PlaybackSession>>>>,
}

impl PlaybackSlot {
    pub fn acquire(&self) -> Result<Arc<PlaybackSession>> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| AnnounceError::PlaybackFailure("playback state poisoned".to_string()))?;
        if current.is_some() {
            return Err(AnnounceError::PlaybackBusy);
        }
        let session = Arc::new(PlaybackSession::default());
        *current = Some(session.clone());
        Ok(session)
    }

    /// Free the slot if `session` still holds it
    pub fn release(&self, session: &Arc<PlaybackSession>) {
        if let Ok(mut current) = self.current.lock() {
            if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, session)) {
                *current = None;
            }
        }
    }

    /// Returns whether a playback was active
    pub fn stop(&self) -> bool {
        match self.current.lock() {
            Ok(current) => match current.as_ref() {
                Some(session) => {
                    session.request_stop();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.lock().map(|c| c.is_some()).unwrap_or(false)
    }
}

/// Plays on the host's default output device
#[derive(Debug, Default)]
pub struct DevicePlayer {
    slot: PlaybackSlot,
}

impl DevicePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.slot.is_active()
    }
}

#[async_trait]
impl Player for DevicePlayer {
    async fn play(&self, waveform: Waveform, blocking: bool) -> Result<PlaybackOutcome> {
        let session = self.slot.acquire()?;

        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let (done_tx, done_rx) = oneshot::channel::<Result<PlaybackOutcome>>();

        let thread_session = session.clone();
        let slot = self.slot.clone();
        let spawned = std::thread::Builder::new()
            .name("announce-playback".to_string())
            .spawn(move || {
                let outcome = run_playback(waveform, &thread_session, ready_tx);
                slot.release(&thread_session);
                let _ = done_tx.send(outcome);
            });

        if let Err(e) = spawned {
            self.slot.release(&session);
            return Err(AnnounceError::PlaybackFailure(format!(
                "Failed to spawn playback thread: {}",
                e
            )));
        }

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(AnnounceError::PlaybackFailure(
                    "playback thread exited before starting".to_string(),
                ))
            }
        }

        if !blocking {
            return Ok(PlaybackOutcome::Started);
        }

        done_rx.await.map_err(|_| {
            AnnounceError::PlaybackFailure("playback thread exited unexpectedly".to_string())
        })?
    }

    fn stop(&self) {
        if self.slot.stop() {
            log::info!("Playback stop requested");
        }
    }
}

/// Body of the playback thread. Reports stream setup through `ready`, then
/// blocks until the samples are out, `stop()` was called, or the stream failed.
fn run_playback(
    waveform: Waveform,
    session: &Arc<PlaybackSession>,
    ready: oneshot::Sender<Result<()>>,
) -> Result<PlaybackOutcome> {
    let finished = Arc::new(AtomicBool::new(false));
    let failed = Arc::new(AtomicBool::new(false));

    let stream = match open_stream(&waveform, session.clone(), finished.clone(), failed.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("Cannot start playback: {}", e);
            let message = e.to_string();
            let _ = ready.send(Err(e));
            return Err(AnnounceError::PlaybackFailure(message));
        }
    };
    let _ = ready.send(Ok(()));

    log::debug!("Playing {:.2}s of audio", waveform.duration().as_secs_f32());

    let outcome = loop {
        if session.is_stopped() {
            break Ok(PlaybackOutcome::Interrupted);
        }
        if failed.load(Ordering::SeqCst) {
            break Err(AnnounceError::PlaybackFailure(
                "output stream reported an error".to_string(),
            ));
        }
        if finished.load(Ordering::SeqCst) {
            std::thread::sleep(DRAIN_GRACE);
            break Ok(PlaybackOutcome::Played);
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    drop(stream);
    outcome
}

fn open_stream(
    waveform: &Waveform,
    session: Arc<PlaybackSession>,
    finished: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AnnounceError::PlaybackFailure("No audio output device found".to_string()))?;

    let supported = device.default_output_config().map_err(|e| {
        AnnounceError::PlaybackFailure(format!("No default output config: {}", e))
    })?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let device_rate = config.sample_rate.0;
    let channels = config.channels as usize;
    log::debug!(
        "Output device: {} ({} Hz, {} ch, {:?})",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        device_rate,
        channels,
        sample_format
    );

    let mono = resample_audio(&waveform.samples, waveform.sample_rate, device_rate);
    let frames = expand_to_channels(&mono, channels);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => {
            build_stream::<f32>(&device, &config, frames, session, finished, failed)
        }
        cpal::SampleFormat::I16 => {
            build_stream::<i16>(&device, &config, frames, session, finished, failed)
        }
        cpal::SampleFormat::U16 => {
            build_stream::<u16>(&device, &config, frames, session, finished, failed)
        }
        other => Err(AnnounceError::PlaybackFailure(format!(
            "Unsupported sample format: {:?}",
            other
        ))),
    }?;

    stream
        .play()
        .map_err(|e| AnnounceError::PlaybackFailure(format!("Failed to start stream: {}", e)))?;
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    frames: Vec<f32>,
    session: Arc<PlaybackSession>,
    finished: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut position = 0usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if session.is_stopped() {
                    data.fill(T::EQUILIBRIUM);
                    return;
                }
                for out in data.iter_mut() {
                    let sample = frames.get(position).copied().unwrap_or(0.0);
                    *out = T::from_sample(sample);
                    position += 1;
                }
                if position >= frames.len() {
                    finished.store(true, Ordering::SeqCst);
                }
            },
            move |err| {
                log::error!("Output stream error: {}", err);
                failed.store(true, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| AnnounceError::PlaybackFailure(format!("Failed to build stream: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let slot = PlaybackSlot::default();
        let _first = slot.acquire().unwrap();
        assert!(matches!(slot.acquire(), Err(AnnounceError::PlaybackBusy)));
    }

    #[test]
    fn test_release_frees_slot() {
        let slot = PlaybackSlot::default();
        let session = slot.acquire().unwrap();
        slot.release(&session);
        assert!(!slot.is_active());
        assert!(slot.acquire().is_ok());
    }

    #[test]
    fn test_stop_while_idle_does_not_affect_next_play() {
        let slot = PlaybackSlot::default();
        assert!(!slot.stop());
        assert!(!slot.stop());

        let session = slot.acquire().unwrap();
        assert!(!session.is_stopped());
    }

    #[test]
    fn test_stop_reaches_active_session() {
        let slot = PlaybackSlot::default();
        let session = slot.acquire().unwrap();
        assert!(slot.stop());
        assert!(session.is_stopped());
    }

    #[test]
    fn test_stale_release_keeps_new_session() {
        let slot = PlaybackSlot::default();
        let old = slot.acquire().unwrap();
        slot.release(&old);
        let _new = slot.acquire().unwrap();

        slot.release(&old);
        assert!(slot.is_active());
    }

    #[test]
    fn test_device_player_stop_idle() {
        let player = DevicePlayer::new();
        player.stop();
        assert!(!player.is_playing());
    }
}
