//! Navigation and live-session controller.
//!
//! Owns section visibility, the history stack and the live detection
//! lifecycle. Network work runs on spawned tasks that report back through
//! [`AppEvent`]s; the owner feeds them into [`Controller::handle_event`] from a
//! single thread, so every state change happens in one place.

pub mod analysis;
pub mod feedback;
pub mod navigation;
pub mod session;
pub mod view;

#[cfg(test)]
mod tests;

use crate::backend::{Backend, BackendError};
use crate::model::{AnalysisResponse, AppConfig, ExerciseData, ExerciseType, ToggleResponse};
use feedback::{FeedbackForm, MessageKind};
use navigation::{NavigationError, NavigationStack, Section};
use session::{Counters, LiveSession, LiveSessionState, PauseIntent};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use view::{LiveSubView, Notification, PauseIcon, ViewState};

/// Results of background work, tagged with the generation they belong to.
#[derive(Debug)]
pub enum AppEvent {
    StreamReady {
        generation: u64,
    },
    StreamFrames {
        generation: u64,
        frames: u64,
        bytes: u64,
    },
    StreamFailed {
        generation: u64,
        reason: String,
    },
    Counters {
        generation: u64,
        data: ExerciseData,
    },
    ToggleFinished {
        generation: u64,
        intent: PauseIntent,
        result: Result<ToggleResponse, BackendError>,
    },
    AnalysisFinished {
        generation: u64,
        result: Result<AnalysisResponse, BackendError>,
    },
    FeedbackFinished {
        result: Result<String, BackendError>,
    },
}

pub struct Controller<B: Backend> {
    backend: Arc<B>,
    rt: Handle,
    tx: UnboundedSender<AppEvent>,
    config: AppConfig,
    history: NavigationStack,
    live: LiveSession,
    analysis_generation: u64,
    view: ViewState,
}

impl<B: Backend> Controller<B> {
    /// Build the controller and show the home section.
    pub fn new(
        backend: Arc<B>,
        rt: Handle,
        config: AppConfig,
    ) -> (Self, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut ctrl = Self {
            backend,
            rt,
            tx,
            config,
            history: NavigationStack::default(),
            live: LiveSession::default(),
            analysis_generation: 0,
            view: ViewState::default(),
        };
        ctrl.show(Section::Home, Section::Home.label(), true);
        ctrl.view.active_nav = Some(Section::Home);
        (ctrl, rx)
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn history(&self) -> &NavigationStack {
        &self.history
    }

    pub fn live_state(&self) -> LiveSessionState {
        self.live.state
    }

    pub fn live_exercise(&self) -> Option<ExerciseType> {
        self.live.exercise
    }

    pub fn is_polling(&self) -> bool {
        self.live.polling.is_some()
    }

    pub fn feedback_form_mut(&mut self) -> &mut FeedbackForm {
        &mut self.view.feedback
    }

    pub fn set_last_export(&mut self, path: std::path::PathBuf) {
        self.view.analysis.last_export = Some(path);
    }

    // ---- navigation ----

    /// Show `target_id` as the only visible section.
    pub fn show_section(
        &mut self,
        target_id: &str,
        breadcrumb: &str,
        push_to_history: bool,
    ) -> Result<(), NavigationError> {
        match Section::from_id(target_id) {
            Ok(section) => {
                self.show(section, breadcrumb, push_to_history);
                Ok(())
            }
            Err(e) => {
                self.view.visible = None;
                tracing::error!(error = %e, "cannot show section");
                Err(e)
            }
        }
    }

    fn show(&mut self, section: Section, breadcrumb: &str, push_to_history: bool) {
        self.view.visible = Some(section);
        if push_to_history {
            self.history.push(section.id(), breadcrumb);
        }
        self.view.back_visible = self.history.len() > 1;
        self.view.breadcrumb = breadcrumb.to_string();
    }

    pub fn go_back(&mut self) {
        match self.history.len() {
            0 => {}
            1 => {
                self.stop_live_session();
                self.show(Section::Home, Section::Home.label(), false);
                self.history.clear();
                self.view.back_visible = false;
                self.view.active_nav = Some(Section::Home);
            }
            _ => {
                self.history.pop();
                let Some(top) = self.history.top().cloned() else {
                    return;
                };
                match Section::from_id(&top.section_id) {
                    Ok(section) => {
                        if section != Section::LiveDetection {
                            self.stop_live_session();
                        }
                        self.show(section, &top.breadcrumb_label, false);
                        self.view.active_nav = Some(section);
                    }
                    Err(e) => {
                        self.view.visible = None;
                        tracing::error!(error = %e, "cannot go back");
                    }
                }
            }
        }
    }

    /// Follow a sidebar link.
    pub fn navigate_to(&mut self, nav_key: &str) {
        let target_id = format!("{nav_key}-content");
        if self
            .history
            .top()
            .is_some_and(|e| e.section_id == target_id)
        {
            self.view.sidebar_open = false;
            return;
        }

        let section = Section::from_nav_key(nav_key);
        self.view.active_nav = section;
        if section != Some(Section::LiveDetection) {
            self.stop_live_session();
        }
        match section {
            Some(Section::LiveDetection) => self.reset_live_view(),
            Some(Section::Analysis) => {
                // Drop whatever analysis is still running.
                self.analysis_generation += 1;
                self.view.analysis.reset();
            }
            _ => {}
        }
        let label = section.map(Section::label).unwrap_or(nav_key);
        let _ = self.show_section(&target_id, label, true);
        self.view.sidebar_open = false;
    }

    pub fn toggle_sidebar(&mut self) {
        self.view.sidebar_open = !self.view.sidebar_open;
    }

    pub fn notify(&mut self, notification: Notification) {
        tracing::info!(title = %notification.title, body = %notification.body, "notification");
        self.view.notification = Some(notification);
    }

    pub fn dismiss_notification(&mut self) {
        self.view.notification = None;
    }

    // ---- live detection ----

    pub fn start_live_session(&mut self, exercise: ExerciseType) {
        self.stop_live_session();

        self.live.generation += 1;
        let generation = self.live.generation;
        self.live.state = LiveSessionState::Loading;
        self.live.exercise = Some(exercise);
        self.live.intentional_stop = false;

        let live = &mut self.view.live;
        live.counters = Counters::initializing();
        live.sub_view = LiveSubView::Video;
        live.loader_visible = true;
        live.status = view::STATUS_LOADING.into();
        live.frames = 0;
        live.stream_bytes = 0;

        tracing::info!(%exercise, generation, "starting live session");
        let prior_stop = self.live.pending_stop.take();
        self.live.stream = Some(session::spawn_stream(
            &self.rt,
            self.backend.clone(),
            exercise,
            generation,
            prior_stop,
            self.tx.clone(),
        ));
    }

    /// Tear down the stream and polling. Safe to call at any time.
    pub fn stop_live_session(&mut self) {
        self.view.live.fullscreen = false;
        let had_session = self.live.has_resources();

        if let Some(stream) = self.live.stream.take() {
            self.live.intentional_stop = true;
            stream.clear();
        }
        if had_session {
            tracing::info!(generation = self.live.generation, "stopping live session");
            let prior = self.live.pending_stop.take();
            self.live.pending_stop = Some(session::spawn_stop_feed(
                &self.rt,
                self.backend.clone(),
                prior,
            ));
        }
        self.live.stop_polling();
        self.live.state = LiveSessionState::Idle;
        self.live.exercise = None;
        self.live.toggle_pending = None;
        self.reset_live_view();
    }

    fn reset_live_view(&mut self) {
        let live = &mut self.view.live;
        live.sub_view = LiveSubView::Selection;
        live.loader_visible = false;
        live.status = view::STATUS_WAITING.into();
        live.pause_icon = PauseIcon::Play;
        live.counters = Counters::idle();
        live.fullscreen = false;
        live.frames = 0;
        live.stream_bytes = 0;
    }

    fn start_polling(&mut self) {
        self.live.stop_polling();
        self.live.polling = Some(session::spawn_polling(
            &self.rt,
            self.backend.clone(),
            self.config.poll_interval,
            self.live.generation,
            self.tx.clone(),
        ));
    }

    pub fn toggle_pause(&mut self) {
        if !self.live.state.is_active() {
            self.notify(Notification::warning(
                "Acción No Permitida",
                "Por favor, selecciona un ejercicio para iniciar la detección en vivo antes de intentar pausar/reanudar.",
            ));
            return;
        }
        if self.live.toggle_pending.is_some() {
            tracing::debug!("pause toggle already in flight");
            return;
        }

        let intent = if self.live.state == LiveSessionState::Paused {
            PauseIntent::Resume
        } else {
            PauseIntent::Pause
        };
        self.view.live.pause_icon = self.view.live.pause_icon.flipped();
        self.view.live.status = match intent {
            PauseIntent::Pause => view::STATUS_PAUSING,
            PauseIntent::Resume => view::STATUS_RESUMING,
        }
        .into();
        self.live.toggle_pending = Some(intent);

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        let generation = self.live.generation;
        self.rt.spawn(async move {
            let result = backend.toggle_pause().await;
            let _ = tx.send(AppEvent::ToggleFinished {
                generation,
                intent,
                result,
            });
        });
    }

    /// Maximize the video panel. Only meaningful while the video is shown.
    pub fn toggle_fullscreen(&mut self) {
        if self.view.visible != Some(Section::LiveDetection)
            || self.view.live.sub_view != LiveSubView::Video
        {
            return;
        }
        self.view.live.fullscreen = !self.view.live.fullscreen;
    }

    /// Stop the live session and hand back the pending `/stop_feed` request
    /// so the caller can wait for it before exiting.
    pub fn shutdown(&mut self) -> Option<JoinHandle<()>> {
        self.stop_live_session();
        self.live.pending_stop.take()
    }

    #[cfg(test)]
    pub(crate) fn clear_stream_source(&mut self) {
        if let Some(stream) = self.live.stream.take() {
            stream.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn intentional_stop(&self) -> bool {
        self.live.intentional_stop
    }

    // ---- analysis ----

    pub fn start_analysis(&mut self, exercise: ExerciseType) {
        self.analysis_generation += 1;
        let generation = self.analysis_generation;
        self.view.analysis.begin(exercise);
        tracing::info!(%exercise, generation, "requesting analysis");

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        self.rt.spawn(async move {
            let result = backend.analyze(exercise).await;
            let _ = tx.send(AppEvent::AnalysisFinished { generation, result });
        });
    }

    // ---- feedback ----

    pub fn submit_feedback(&mut self) {
        let form = &mut self.view.feedback;
        if form.submitting {
            return;
        }
        form.editing = false;
        let answers = match form.to_payload() {
            Ok(answers) => answers,
            Err(e) => {
                form.set_message(e.to_string(), MessageKind::Error);
                return;
            }
        };
        form.submitting = true;

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        self.rt.spawn(async move {
            let result = backend.submit_feedback(&answers).await;
            let _ = tx.send(AppEvent::FeedbackFinished { result });
        });
    }

    /// Time-based housekeeping, called from the owner's loop.
    pub fn tick(&mut self) {
        self.view.feedback.expire_message(tokio::time::Instant::now());
    }

    // ---- events ----

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::StreamReady { generation } => {
                if generation != self.live.generation
                    || self.live.state != LiveSessionState::Loading
                {
                    return;
                }
                tracing::info!(generation, "video stream ready");
                self.live.state = LiveSessionState::Detecting;
                let live = &mut self.view.live;
                live.loader_visible = false;
                live.status = view::STATUS_DETECTING.into();
                live.pause_icon = PauseIcon::Pause;
                self.start_polling();
            }
            AppEvent::StreamFrames {
                generation,
                frames,
                bytes,
            } => {
                if generation == self.live.generation {
                    self.view.live.frames = frames;
                    self.view.live.stream_bytes = bytes;
                }
            }
            AppEvent::StreamFailed { generation, reason } => {
                if generation != self.live.generation {
                    tracing::debug!(generation, "ignoring failure of a replaced stream");
                    return;
                }
                if std::mem::take(&mut self.live.intentional_stop) {
                    tracing::debug!(generation, "stream cleared on stop");
                    return;
                }
                tracing::warn!(generation, %reason, "video stream failed");
                self.live.state = LiveSessionState::Error;
                self.live.stop_polling();
                self.live.toggle_pending = None;
                self.view.live.loader_visible = false;
                self.view.live.status = view::STATUS_LOAD_ERROR.into();
                self.notify(Notification::error(
                    "Error de Cámara",
                    "No se pudo iniciar el stream de la cámara. Asegúrate de que esté conectada y no esté en uso por otra aplicación.",
                ));
            }
            AppEvent::Counters { generation, data } => {
                if generation == self.live.generation
                    && self.live.state == LiveSessionState::Detecting
                {
                    self.view.live.counters = Counters::from(&data);
                }
            }
            AppEvent::ToggleFinished {
                generation,
                intent,
                result,
            } => self.finish_toggle(generation, intent, result),
            AppEvent::AnalysisFinished { generation, result } => {
                if generation != self.analysis_generation {
                    tracing::debug!(generation, "discarding stale analysis result");
                    return;
                }
                match result {
                    Ok(response) => self.view.analysis.apply(&response),
                    Err(e) => {
                        tracing::warn!(error = %e, "analysis request failed");
                        self.view.analysis.fail(&e.user_message());
                    }
                }
            }
            AppEvent::FeedbackFinished { result } => {
                let form = &mut self.view.feedback;
                form.submitting = false;
                match result {
                    Ok(message) => {
                        form.reset();
                        form.set_message(message, MessageKind::Success);
                    }
                    Err(BackendError::Status { message, .. }) => {
                        form.set_message(
                            message.unwrap_or_else(|| feedback::SUBMIT_FAILED.into()),
                            MessageKind::Error,
                        );
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "feedback submission failed");
                        form.set_message(feedback::CONNECTION_FAILED, MessageKind::Error);
                    }
                }
            }
        }
    }

    fn finish_toggle(
        &mut self,
        generation: u64,
        intent: PauseIntent,
        result: Result<ToggleResponse, BackendError>,
    ) {
        if generation != self.live.generation {
            return;
        }
        self.live.toggle_pending = None;
        if !self.live.state.is_active() {
            return;
        }
        match result {
            Ok(resp) if resp.status == intent.confirmation() => match intent {
                PauseIntent::Pause => {
                    self.live.state = LiveSessionState::Paused;
                    self.live.stop_polling();
                    self.view.live.status = view::STATUS_PAUSED.into();
                }
                PauseIntent::Resume => {
                    self.live.state = LiveSessionState::Detecting;
                    self.view.live.status = view::STATUS_DETECTING.into();
                    self.start_polling();
                }
            },
            Ok(resp) => {
                tracing::warn!(status = %resp.status, ?intent, "unexpected pause toggle status");
                self.view.live.pause_icon = self.view.live.pause_icon.flipped();
                self.view.live.status = view::STATUS_STATE_ERROR.into();
                self.notify(Notification::error(
                    "Error de Estado",
                    format!("Estado desconocido recibido del servidor: {}", resp.status),
                ));
            }
            Err(e) => {
                tracing::warn!(error = %e, "pause toggle failed");
                self.view.live.pause_icon = self.view.live.pause_icon.flipped();
                self.view.live.status = view::STATUS_CONTROL_ERROR.into();
                self.notify(Notification::error(
                    "Error de Control",
                    format!(
                        "No se pudo alternar el estado de la detección: {}.",
                        e.user_message()
                    ),
                ));
            }
        }
    }
}
