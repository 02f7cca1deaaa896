use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            poll_interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
            user_agent: format!("pose-coach/{}", env!("CARGO_PKG_VERSION")),
            export_dir: PathBuf::from("."),
        }
    }
}

/// Exercises the backend has pose detectors and datasets for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    Squats,
    Pushups,
    Deadlift,
    #[value(alias = "shoulder_press")]
    ShoulderPress,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 4] = [
        ExerciseType::Squats,
        ExerciseType::Pushups,
        ExerciseType::Deadlift,
        ExerciseType::ShoulderPress,
    ];

    /// Value used in URLs and request bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseType::Squats => "squats",
            ExerciseType::Pushups => "pushups",
            ExerciseType::Deadlift => "deadlift",
            ExerciseType::ShoulderPress => "shoulder_press",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExerciseType::Squats => "Sentadillas",
            ExerciseType::Pushups => "Flexiones",
            ExerciseType::Deadlift => "Peso muerto",
            ExerciseType::ShoulderPress => "Press de hombro",
        }
    }

    /// Map a 1-based menu position to an exercise.
    pub fn from_menu_index(idx: usize) -> Option<Self> {
        idx.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest counters published by `/exercise_data`. The backend starts with an
/// empty object, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseData {
    #[serde(default)]
    pub reps: Option<u64>,
    #[serde(default)]
    pub incorrect_reps: Option<u64>,
    #[serde(default)]
    pub stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepsChartData {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<u64>,
    #[serde(default)]
    pub chart_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrixData {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub prediction_labels: Vec<String>,
    #[serde(default)]
    pub matrix: Vec<Vec<u64>>,
    #[serde(default)]
    pub chart_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RocData {
    #[serde(default)]
    pub fpr: Vec<f64>,
    #[serde(default)]
    pub tpr: Vec<f64>,
    #[serde(default)]
    pub auc: f64,
    #[serde(default)]
    pub chart_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrData {
    #[serde(default)]
    pub recall: Vec<f64>,
    #[serde(default)]
    pub precision: Vec<f64>,
    #[serde(default)]
    pub chart_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReportData {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
}

/// Response of `/analyze_exercise`. Either a `success` payload with the
/// precomputed analytics or an object carrying `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub classification_report_data: Option<ClassificationReportData>,
    #[serde(default)]
    pub chart_data_reps: Option<RepsChartData>,
    #[serde(default)]
    pub confusion_matrix_data: Option<ConfusionMatrixData>,
    #[serde(default)]
    pub roc_data: Option<RocData>,
    #[serde(default)]
    pub pr_data: Option<PrData>,
}

impl AnalysisResponse {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// Render a JSON value the way it would appear as cell text.
pub fn display_json_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_json_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}
