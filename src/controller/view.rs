//! Renderable state owned by the controller. Presentation layers only read it.

use super::analysis::AnalysisView;
use super::feedback::FeedbackForm;
use super::navigation::Section;
use super::session::Counters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

impl Notification {
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity: Severity::Warning,
        }
    }

    pub fn success(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity: Severity::Success,
        }
    }

    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity: Severity::Info,
        }
    }
}

/// Icon of the pause/resume control. `Play` is the idle default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseIcon {
    Play,
    Pause,
}

impl PauseIcon {
    pub fn flipped(self) -> Self {
        match self {
            PauseIcon::Play => PauseIcon::Pause,
            PauseIcon::Pause => PauseIcon::Play,
        }
    }
}

/// Which half of the live section is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveSubView {
    Selection,
    Video,
}

pub const STATUS_WAITING: &str = "Esperando selección";
pub const STATUS_LOADING: &str = "Cargando video...";
pub const STATUS_DETECTING: &str = "Detectando...";
pub const STATUS_PAUSING: &str = "Pausando...";
pub const STATUS_RESUMING: &str = "Reanudando...";
pub const STATUS_PAUSED: &str = "Pausado";
pub const STATUS_LOAD_ERROR: &str = "Error de carga";
pub const STATUS_CONTROL_ERROR: &str = "Error de control";
pub const STATUS_STATE_ERROR: &str = "Error de estado";

#[derive(Debug, Clone)]
pub struct LiveView {
    pub sub_view: LiveSubView,
    pub loader_visible: bool,
    pub status: String,
    pub pause_icon: PauseIcon,
    pub counters: Counters,
    pub fullscreen: bool,
    pub frames: u64,
    pub stream_bytes: u64,
}

impl Default for LiveView {
    fn default() -> Self {
        Self {
            sub_view: LiveSubView::Selection,
            loader_visible: false,
            status: STATUS_WAITING.into(),
            pause_icon: PauseIcon::Play,
            counters: Counters::idle(),
            fullscreen: false,
            frames: 0,
            stream_bytes: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewState {
    /// The single visible section; `None` after a failed lookup.
    pub visible: Option<Section>,
    pub breadcrumb: String,
    pub back_visible: bool,
    pub active_nav: Option<Section>,
    pub sidebar_open: bool,
    pub notification: Option<Notification>,
    pub live: LiveView,
    pub analysis: AnalysisView,
    pub feedback: FeedbackForm,
}

impl ViewState {
    pub fn is_visible(&self, section: Section) -> bool {
        self.visible == Some(section)
    }
}
