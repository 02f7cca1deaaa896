//! Scripted backend for controller tests.

use super::{Backend, BackendError, VideoStream};
use crate::model::{AnalysisResponse, ExerciseData, ExerciseType, ToggleResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// What `open_stream` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamScript {
    /// Emit one frame, then stay open until dropped.
    Frames,
    /// Stay open without ever sending a byte.
    Stall,
    /// Refuse the request, like a camera that is busy.
    Refuse,
}

pub struct MockBackend {
    pub stream: Mutex<StreamScript>,
    pub counters: Mutex<ExerciseData>,
    pub toggle: Mutex<Result<String, String>>,
    pub analysis: Mutex<Result<AnalysisResponse, (u16, Option<String>)>>,
    pub feedback: Mutex<Result<String, (u16, Option<String>)>>,
    pub streams_opened: AtomicUsize,
    pub data_fetches: AtomicUsize,
    pub toggles: AtomicUsize,
    pub stops: AtomicUsize,
    pub analyses: AtomicUsize,
    pub submitted: Mutex<Vec<Map<String, Value>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            stream: Mutex::new(StreamScript::Frames),
            counters: Mutex::new(ExerciseData {
                reps: Some(4),
                incorrect_reps: Some(1),
                stage: Some("up".into()),
            }),
            toggle: Mutex::new(Ok("Pausado".into())),
            analysis: Mutex::new(Ok(AnalysisResponse::default())),
            feedback: Mutex::new(Ok("Feedback recibido y PDF generado".into())),
            streams_opened: AtomicUsize::new(0),
            data_fetches: AtomicUsize::new(0),
            toggles: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            analyses: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl MockBackend {
    pub fn set_stream(&self, script: StreamScript) {
        *self.stream.lock().unwrap() = script;
    }

    pub fn set_toggle(&self, status: Result<&str, &str>) {
        *self.toggle.lock().unwrap() = status.map(str::to_string).map_err(str::to_string);
    }

    pub fn fetches(&self) -> usize {
        self.data_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn open_stream(&self, _exercise: ExerciseType) -> Result<VideoStream, BackendError> {
        self.streams_opened.fetch_add(1, Ordering::SeqCst);
        let script = *self.stream.lock().unwrap();
        let body = match script {
            StreamScript::Frames => futures::stream::once(async {
                Ok::<_, BackendError>(Bytes::from_static(
                    b"--frame\r\nContent-Type: image/jpeg\r\n\r\n\xff\xd8\xff\xd9\r\n",
                ))
            })
            .chain(futures::stream::pending())
            .boxed(),
            StreamScript::Stall => futures::stream::pending::<Result<Bytes, BackendError>>().boxed(),
            StreamScript::Refuse => {
                return Err(BackendError::Status {
                    status: 500,
                    message: None,
                })
            }
        };
        Ok(VideoStream {
            boundary: "frame".into(),
            body,
        })
    }

    async fn exercise_data(&self) -> Result<ExerciseData, BackendError> {
        self.data_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.counters.lock().unwrap().clone())
    }

    async fn toggle_pause(&self) -> Result<ToggleResponse, BackendError> {
        self.toggles.fetch_add(1, Ordering::SeqCst);
        match self.toggle.lock().unwrap().clone() {
            Ok(status) => Ok(ToggleResponse { status }),
            Err(msg) => Err(BackendError::Connection(msg)),
        }
    }

    async fn stop_feed(&self) -> Result<(), BackendError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn analyze(&self, _exercise: ExerciseType) -> Result<AnalysisResponse, BackendError> {
        self.analyses.fetch_add(1, Ordering::SeqCst);
        self.analysis
            .lock()
            .unwrap()
            .clone()
            .map_err(|(status, message)| BackendError::Status { status, message })
    }

    async fn submit_feedback(
        &self,
        answers: &Map<String, Value>,
    ) -> Result<String, BackendError> {
        self.submitted.lock().unwrap().push(answers.clone());
        self.feedback
            .lock()
            .unwrap()
            .clone()
            .map_err(|(status, message)| BackendError::Status { status, message })
    }
}
