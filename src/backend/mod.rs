//! Backend endpoints consumed by the controller.
//!
//! The controller only talks to the [`Backend`] trait so the live-session
//! lifecycle can be driven by a scripted backend in tests.

mod http;
pub(crate) mod mjpeg;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpBackend;

use crate::model::{AnalysisResponse, ExerciseData, ExerciseType, ToggleResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error! status: {status}")]
    Status {
        status: u16,
        /// `error`/`message` field of the JSON error body, when present.
        message: Option<String>,
    },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("stream closed")]
    StreamClosed,
    #[error("{0}")]
    Connection(String),
}

impl BackendError {
    /// Message to show the user for a failed request.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// A server-pushed multipart image stream.
pub struct VideoStream {
    /// Multipart boundary announced by the server (without the leading `--`).
    pub boundary: String,
    pub body: BoxStream<'static, Result<Bytes, BackendError>>,
}

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// `GET /video_feed/{exercise}`: resolves once the response headers arrive.
    async fn open_stream(&self, exercise: ExerciseType) -> Result<VideoStream, BackendError>;

    /// `GET /exercise_data`
    async fn exercise_data(&self) -> Result<ExerciseData, BackendError>;

    /// `POST /toggle_detection_pause`
    async fn toggle_pause(&self) -> Result<ToggleResponse, BackendError>;

    /// `GET /stop_feed`
    async fn stop_feed(&self) -> Result<(), BackendError>;

    /// `POST /analyze_exercise`
    async fn analyze(&self, exercise: ExerciseType) -> Result<AnalysisResponse, BackendError>;

    /// `POST /submit_feedback`, returns the backend's confirmation message.
    async fn submit_feedback(&self, answers: &Map<String, Value>)
        -> Result<String, BackendError>;
}
