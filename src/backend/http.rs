use super::{mjpeg, Backend, BackendError, VideoStream};
use crate::model::{AppConfig, AnalysisResponse, ExerciseData, ExerciseType, FeedbackResponse, ToggleResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde_json::{Map, Value};
use std::time::Duration;

/// reqwest client for the pose detection backend.
pub struct HttpBackend {
    http: reqwest::Client,
    base: Url,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        let mut base = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid backend URL: {}", cfg.base_url))?;
        // `Url::join` drops the last path segment unless the base ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base,
            request_timeout: cfg.request_timeout,
        })
    }

    fn url(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|e| BackendError::Connection(format!("invalid URL for {path}: {e}")))
    }
}

/// Turn a non-2xx response into a `Status` error, keeping the backend's
/// `error` or `message` field when the body is JSON.
async fn error_from_response(resp: reqwest::Response) -> BackendError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body).ok().and_then(|v| {
        v.get("error")
            .or_else(|| v.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });
    BackendError::Status { status, message }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn open_stream(&self, exercise: ExerciseType) -> Result<VideoStream, BackendError> {
        let url = self.url(&format!("video_feed/{}", exercise.as_str()))?;
        // No timeout: the body never ends while the camera is streaming.
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        let boundary = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(mjpeg::boundary_from_content_type)
            .unwrap_or_else(|| mjpeg::DEFAULT_BOUNDARY.to_string());
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(BackendError::from))
            .boxed();
        Ok(VideoStream { boundary, body })
    }

    async fn exercise_data(&self) -> Result<ExerciseData, BackendError> {
        let resp = self
            .http
            .get(self.url("exercise_data")?)
            .timeout(self.request_timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(resp.json::<ExerciseData>().await?)
    }

    async fn toggle_pause(&self) -> Result<ToggleResponse, BackendError> {
        let resp = self
            .http
            .post(self.url("toggle_detection_pause")?)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        // The backend answers 400 with a `status` text when nothing is running;
        // that text is still a toggle outcome the controller has to reconcile.
        match serde_json::from_str::<ToggleResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(BackendError::Status {
                status: status.as_u16(),
                message: None,
            }),
            Err(e) => Err(BackendError::Decode(e)),
        }
    }

    async fn stop_feed(&self) -> Result<(), BackendError> {
        let resp = self
            .http
            .get(self.url("stop_feed")?)
            .timeout(self.request_timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(())
    }

    async fn analyze(&self, exercise: ExerciseType) -> Result<AnalysisResponse, BackendError> {
        // Training runs server-side; the request timeout does not apply here.
        let resp = self
            .http
            .post(self.url("analyze_exercise")?)
            .json(&serde_json::json!({ "exercise_type": exercise.as_str() }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(resp.json::<AnalysisResponse>().await?)
    }

    async fn submit_feedback(
        &self,
        answers: &Map<String, Value>,
    ) -> Result<String, BackendError> {
        let resp = self
            .http
            .post(self.url("submit_feedback")?)
            .timeout(self.request_timeout)
            .json(answers)
            .send()
            .await?;
        let status = resp.status();
        let body: FeedbackResponse = resp.json().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: body.message,
            });
        }
        Ok(body.message.unwrap_or_default())
    }
}
