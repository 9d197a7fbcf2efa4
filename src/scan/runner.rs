// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Background task feeding camera frames into a [`ScanSession`].
//!
//! [`ScanLoop::spawn`] polls a [`FrameSource`] once per decode interval and
//! forwards detections on an mpsc channel. Polling pauses while the session
//! holds a detection or a commit outcome. The returned [`ScanHandle`] owns
//! the task: [`ScanHandle::stop`] waits until the source is released, and
//! dropping the handle signals the same shutdown without waiting.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior}
};
use tracing::{debug, warn};
use workorder_core::PayloadError;

use super::{FrameOutcome, ScanSession};
use crate::config::ScanConfig;

const EVENT_BUFFER: usize = 8;

/// Camera or other producer of decoded QR payloads.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Device error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Grab and decode the next frame.
    ///
    /// Returns `None` when the frame holds no QR code.
    async fn next_frame(&mut self) -> Result<Option<String>, Self::Error>;

    /// Release the device.
    async fn release(&mut self);
}

/// Notification from a running scan loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A work id was read and the session awaits confirmation.
    Detected {
        /// Detected work.
        work_id: i64
    },
    /// A payload was read that names no work.
    Invalid(PayloadError),
    /// The frame source failed and the loop ended.
    SourceFailed(String)
}

/// Spawner for scan tasks.
pub struct ScanLoop;

impl ScanLoop {
    /// Start polling `source` into a new session.
    pub fn spawn<S: FrameSource>(
        source: S,
        config: ScanConfig
    ) -> (ScanHandle, mpsc::Receiver<ScanEvent>) {
        let session = Arc::new(Mutex::new(ScanSession::new(config)));
        let (stop_tx, stop_rx) = oneshot::channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let task = tokio::spawn(run(source, Arc::clone(&session), config, stop_rx, event_tx));

        let handle = ScanHandle {
            session,
            stop_tx: Some(stop_tx),
            task: Some(task)
        };
        (handle, event_rx)
    }
}

async fn run<S: FrameSource>(
    mut source: S,
    session: Arc<Mutex<ScanSession>>,
    config: ScanConfig,
    mut stop_rx: oneshot::Receiver<()>,
    events: mpsc::Sender<ScanEvent>
) {
    let mut ticker = tokio::time::interval(config.decode_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {}
        }
        if !session.lock().await.state().accepts_frames(Instant::now()) {
            continue;
        }

        let frame = tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            frame = source.next_frame() => frame
        };
        let payload = match frame {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "frame source failed");
                let _ = events.send(ScanEvent::SourceFailed(e.to_string())).await;
                break;
            }
        };

        let outcome = session.lock().await.offer_frame(&payload, Instant::now());
        let event = match outcome {
            FrameOutcome::Detected(work_id) => ScanEvent::Detected {
                work_id
            },
            FrameOutcome::Invalid(e) => ScanEvent::Invalid(e),
            FrameOutcome::Throttled | FrameOutcome::Ignored => continue
        };
        if events.send(event).await.is_err() {
            break;
        }
    }

    source.release().await;
    session.lock().await.stop();
    debug!("scan loop stopped");
}

/// Owner of a running scan loop.
pub struct ScanHandle {
    session: Arc<Mutex<ScanSession>>,
    stop_tx: Option<oneshot::Sender<()>>,
    task:    Option<JoinHandle<()>>
}

impl ScanHandle {
    /// Session driven by the loop.
    ///
    /// Lock it to confirm, commit or rescan.
    pub fn session(&self) -> Arc<Mutex<ScanSession>> {
        Arc::clone(&self.session)
    }

    /// Stop the loop and wait until the frame source is released.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "scan task failed");
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        // No-op once `stop` has run.
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Duration
    };

    use super::*;
    use crate::scan::ScanState;

    #[derive(Debug, thiserror::Error)]
    #[error("camera unplugged")]
    struct Unplugged;

    struct ScriptedCamera {
        frames:   VecDeque<Option<String>>,
        grabs:    Arc<AtomicUsize>,
        released: Arc<AtomicBool>
    }

    #[async_trait]
    impl FrameSource for ScriptedCamera {
        type Error = Unplugged;

        async fn next_frame(&mut self) -> Result<Option<String>, Unplugged> {
            self.grabs.fetch_add(1, Ordering::SeqCst);
            match self.frames.pop_front() {
                Some(frame) => Ok(frame),
                None => Err(Unplugged)
            }
        }

        async fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn camera(frames: &[Option<&str>]) -> (ScriptedCamera, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let camera = ScriptedCamera {
            frames:   frames.iter().map(|f| f.map(str::to_owned)).collect(),
            grabs:    Arc::new(AtomicUsize::new(0)),
            released: Arc::clone(&released)
        };
        (camera, released)
    }

    #[tokio::test(start_paused = true)]
    async fn detection_is_forwarded() {
        let (source, _) = camera(&[None, Some("workid:#5"), Some("workid:6"), None, None]);
        let (handle, mut events) = ScanLoop::spawn(source, ScanConfig::default());

        assert_eq!(events.recv().await, Some(ScanEvent::Detected {
            work_id: 5
        }));
        assert_eq!(handle.session().lock().await.state(), &ScanState::Detected {
            work_id: 5
        });
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn camera_is_idle_until_rescan() {
        let (source, _) = camera(&[Some("workid:5")]);
        let grabs = Arc::clone(&source.grabs);
        let (handle, mut events) = ScanLoop::spawn(source, ScanConfig::default());

        assert_eq!(events.recv().await, Some(ScanEvent::Detected {
            work_id: 5
        }));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(grabs.load(Ordering::SeqCst), 1);

        handle.session().lock().await.rescan().unwrap();
        assert_eq!(
            events.recv().await,
            Some(ScanEvent::SourceFailed("camera unplugged".into()))
        );
        assert_eq!(grabs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_releases_source() {
        let frames: Vec<Option<&str>> = vec![None; 1_000];
        let (source, released) = camera(&frames);
        let (handle, _events) = ScanLoop::spawn(source, ScanConfig::default());
        let session = handle.session();

        tokio::time::sleep(Duration::from_millis(350)).await;
        handle.stop().await;

        assert!(released.load(Ordering::SeqCst));
        assert_eq!(session.lock().await.state(), &ScanState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_loop() {
        let frames: Vec<Option<&str>> = vec![None; 1_000];
        let (source, released) = camera(&frames);
        let (handle, mut events) = ScanLoop::spawn(source, ScanConfig::default());
        drop(handle);

        // Sender side closes once the task has exited.
        assert_eq!(events.recv().await, None);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn source_failure_ends_loop() {
        let (source, released) = camera(&[]);
        let (_handle, mut events) = ScanLoop::spawn(source, ScanConfig::default());

        assert_eq!(
            events.recv().await,
            Some(ScanEvent::SourceFailed("camera unplugged".into()))
        );
        assert_eq!(events.recv().await, None);
        assert!(released.load(Ordering::SeqCst));
    }
}
