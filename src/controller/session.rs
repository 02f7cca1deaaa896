//! Live detection session: stream and polling tasks plus their handles.

use super::AppEvent;
use crate::backend::mjpeg::FrameCounter;
use crate::backend::Backend;
use crate::model::{ExerciseData, ExerciseType};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Minimum spacing between frame-count updates sent to the UI.
const FRAME_REPORT_EVERY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveSessionState {
    Idle,
    Loading,
    Detecting,
    Paused,
    Error,
}

impl LiveSessionState {
    /// A session the backend is actively running (pause/resume allowed).
    pub fn is_active(self) -> bool {
        matches!(self, LiveSessionState::Detecting | LiveSessionState::Paused)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counters {
    pub reps: u64,
    pub incorrect_reps: u64,
    pub stage: String,
}

impl Counters {
    pub fn idle() -> Self {
        Self {
            reps: 0,
            incorrect_reps: 0,
            stage: "N/A".into(),
        }
    }

    pub fn initializing() -> Self {
        Self {
            reps: 0,
            incorrect_reps: 0,
            stage: "Inicializando...".into(),
        }
    }
}

impl From<&ExerciseData> for Counters {
    fn from(d: &ExerciseData) -> Self {
        Self {
            reps: d.reps.unwrap_or(0),
            incorrect_reps: d.incorrect_reps.unwrap_or(0),
            stage: d.stage.clone().unwrap_or_else(|| "N/A".into()),
        }
    }
}

/// Direction of a pause/resume request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseIntent {
    Pause,
    Resume,
}

impl PauseIntent {
    /// Status text the backend answers with when the request took effect.
    pub fn confirmation(self) -> &'static str {
        match self {
            PauseIntent::Pause => "Pausado",
            PauseIntent::Resume => "Reanudado",
        }
    }
}

/// The stream source. Clearing it makes the stream task report a failure.
pub struct StreamHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn clear(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        // The task reports the failure itself and then exits.
        drop(self.task);
    }
}

pub struct LiveSession {
    pub state: LiveSessionState,
    pub exercise: Option<ExerciseType>,
    pub generation: u64,
    pub intentional_stop: bool,
    pub stream: Option<StreamHandle>,
    pub polling: Option<JoinHandle<()>>,
    pub toggle_pending: Option<PauseIntent>,
    pub pending_stop: Option<JoinHandle<()>>,
}

impl Default for LiveSession {
    fn default() -> Self {
        Self {
            state: LiveSessionState::Idle,
            exercise: None,
            generation: 0,
            intentional_stop: false,
            stream: None,
            polling: None,
            toggle_pending: None,
            pending_stop: None,
        }
    }
}

impl LiveSession {
    pub fn stop_polling(&mut self) {
        if let Some(h) = self.polling.take() {
            h.abort();
        }
    }

    pub fn has_resources(&self) -> bool {
        self.stream.is_some() || self.polling.is_some() || self.state != LiveSessionState::Idle
    }
}

/// Open the video stream for `exercise` once `prior_stop` has completed.
/// Reports `StreamReady` on the first body bytes and `StreamFailed` when the
/// stream ends, errors, or is cleared.
pub fn spawn_stream<B: Backend>(
    rt: &Handle,
    backend: Arc<B>,
    exercise: ExerciseType,
    generation: u64,
    prior_stop: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<AppEvent>,
) -> StreamHandle {
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let task = rt.spawn(async move {
        let pump = async {
            if let Some(stop) = prior_stop {
                let _ = stop.await;
            }
            pump_stream(backend.as_ref(), exercise, generation, &tx).await
        };
        let reason = tokio::select! {
            _ = cancel_rx => "stream source cleared".to_string(),
            reason = pump => reason,
        };
        tracing::debug!(generation, %reason, "video stream closed");
        let _ = tx.send(AppEvent::StreamFailed { generation, reason });
    });
    StreamHandle {
        cancel: Some(cancel_tx),
        task,
    }
}

async fn pump_stream<B: Backend>(
    backend: &B,
    exercise: ExerciseType,
    generation: u64,
    tx: &mpsc::UnboundedSender<AppEvent>,
) -> String {
    let mut stream = match backend.open_stream(exercise).await {
        Ok(s) => s,
        Err(e) => return e.user_message(),
    };
    let mut counter = FrameCounter::new(&stream.boundary);
    let mut ready = false;
    let mut last_report = Instant::now();

    while let Some(chunk) = stream.body.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => return e.user_message(),
        };
        counter.push(&chunk);
        if !ready {
            ready = true;
            if tx.send(AppEvent::StreamReady { generation }).is_err() {
                return "controller gone".into();
            }
        }
        if last_report.elapsed() >= FRAME_REPORT_EVERY || counter.frames() == 1 {
            last_report = Instant::now();
            let _ = tx.send(AppEvent::StreamFrames {
                generation,
                frames: counter.frames(),
                bytes: counter.bytes(),
            });
        }
    }
    crate::backend::BackendError::StreamClosed.to_string()
}

/// Fetch `/exercise_data` every `every`, starting one period from now.
pub fn spawn_polling<B: Backend>(
    rt: &Handle,
    backend: Arc<B>,
    every: Duration,
    generation: u64,
    tx: mpsc::UnboundedSender<AppEvent>,
) -> JoinHandle<()> {
    rt.spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match backend.exercise_data().await {
                Ok(data) => {
                    if tx.send(AppEvent::Counters { generation, data }).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "exercise data poll failed"),
            }
        }
    })
}

/// Best-effort `/stop_feed`, sent after `prior` completes. Failures are only
/// logged.
pub fn spawn_stop_feed<B: Backend>(
    rt: &Handle,
    backend: Arc<B>,
    prior: Option<JoinHandle<()>>,
) -> JoinHandle<()> {
    rt.spawn(async move {
        if let Some(prior) = prior {
            let _ = prior.await;
        }
        if let Err(e) = backend.stop_feed().await {
            tracing::warn!(error = %e, "stop_feed request failed");
        }
    })
}
