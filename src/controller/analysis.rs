//! Presentation model for `/analyze_exercise` results.

use crate::model::{
    display_json_value, AnalysisResponse, ClassificationReportData, ConfusionMatrixData,
    ExerciseType, PrData, RepsChartData, RocData,
};
use serde::Serialize;
use serde_json::{Map, Value};

pub const NO_REPORT_DATA: &str = "No hay datos de reporte de clasificación disponibles.";
const REPS_UNAVAILABLE: &str = "Datos de Repeticiones no disponibles o incompletos.";
const CONFUSION_UNAVAILABLE: &str =
    "Datos de la Matriz de Confusión no disponibles o incompletos.";
const ROC_UNAVAILABLE: &str = "Datos de la curva ROC no disponibles o incompletos.";
const PR_UNAVAILABLE: &str = "Datos de la curva Precision-Recall no disponibles o incompletos.";

/// Columns rendered with two decimals.
const DECIMAL_COLUMNS: [&str; 3] = ["Precision", "Recall", "F1-Score"];

/// A chart position in the results area.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "chart", rename_all = "snake_case")]
pub enum ChartSlot<T> {
    Empty,
    Rendered(T),
    Unavailable(String),
}

impl<T> ChartSlot<T> {
    pub fn rendered(&self) -> Option<&T> {
        match self {
            ChartSlot::Rendered(c) => Some(c),
            _ => None,
        }
    }
}

impl<T> Default for ChartSlot<T> {
    fn default() -> Self {
        ChartSlot::Empty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Reps,
    ConfusionMatrix,
    Roc,
    PrecisionRecall,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Reps,
        ChartKind::ConfusionMatrix,
        ChartKind::Roc,
        ChartKind::PrecisionRecall,
    ];

    /// File stem used by exports.
    pub fn chart_id(self) -> &'static str {
        match self {
            ChartKind::Reps => "chart-reps",
            ChartKind::ConfusionMatrix => "chart-confusion-matrix",
            ChartKind::Roc => "chart-roc",
            ChartKind::PrecisionRecall => "chart-pr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub bars: Vec<(String, u64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixCell {
    pub actual: String,
    pub predicted: String,
    pub value: u64,
    /// `value / max` over the whole matrix, 0 when every cell is 0.
    pub intensity: f64,
    pub diagonal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionGrid {
    pub title: String,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub cells: Vec<Vec<MatrixCell>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
    /// Dashed chance line from (0,0) to (1,1) on ROC plots.
    pub reference: Option<[(f64, f64); 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSet {
    pub reps: ChartSlot<BarChart>,
    pub confusion: ChartSlot<ConfusionGrid>,
    pub roc: ChartSlot<CurveChart>,
    pub pr: ChartSlot<CurveChart>,
}

impl ChartSet {
    pub fn from_response(r: &AnalysisResponse) -> Self {
        Self {
            reps: prepare_reps(r.chart_data_reps.as_ref()),
            confusion: prepare_confusion(r.confusion_matrix_data.as_ref()),
            roc: prepare_roc(r.roc_data.as_ref()),
            pr: prepare_pr(r.pr_data.as_ref()),
        }
    }

    /// Rendered chart as JSON, or `None` when the slot holds no chart.
    pub fn export_value(&self, kind: ChartKind) -> Option<Value> {
        let v = match kind {
            ChartKind::Reps => serde_json::to_value(self.reps.rendered()?),
            ChartKind::ConfusionMatrix => serde_json::to_value(self.confusion.rendered()?),
            ChartKind::Roc => serde_json::to_value(self.roc.rendered()?),
            ChartKind::PrecisionRecall => serde_json::to_value(self.pr.rendered()?),
        };
        v.ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRow {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Set instead of rows when the backend sent no report rows.
    pub empty_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalysisView {
    pub menu_visible: bool,
    pub results_visible: bool,
    pub loader_visible: bool,
    pub exercise: Option<ExerciseType>,
    /// Inline message replacing the results panels.
    pub error: Option<String>,
    pub metrics: Option<Vec<MetricRow>>,
    pub report: Option<ReportTable>,
    pub charts: Option<ChartSet>,
    pub last_export: Option<std::path::PathBuf>,
}

impl Default for AnalysisView {
    fn default() -> Self {
        Self {
            menu_visible: true,
            results_visible: false,
            loader_visible: false,
            exercise: None,
            error: None,
            metrics: None,
            report: None,
            charts: None,
            last_export: None,
        }
    }
}

impl AnalysisView {
    /// Entry reset: selection menu back, panels hidden, charts destroyed.
    pub fn reset(&mut self) {
        let last_export = self.last_export.take();
        *self = Self {
            last_export,
            ..Self::default()
        };
    }

    pub fn begin(&mut self, exercise: ExerciseType) {
        self.menu_visible = false;
        self.results_visible = true;
        self.loader_visible = true;
        self.exercise = Some(exercise);
        self.error = None;
        self.metrics = None;
        self.report = None;
        self.charts = None;
    }

    pub fn apply(&mut self, response: &AnalysisResponse) {
        self.loader_visible = false;
        if response.is_success() {
            self.metrics = Some(metric_rows(&response.metrics));
            self.report = Some(report_table(response.classification_report_data.as_ref()));
            self.charts = Some(ChartSet::from_response(response));
        } else {
            self.error = Some(format!(
                "Error en el análisis: {}",
                response.error.as_deref().unwrap_or("Mensaje desconocido")
            ));
        }
    }

    pub fn fail(&mut self, message: &str) {
        self.loader_visible = false;
        self.results_visible = true;
        self.error = Some(format!("Error de conexión o del servidor: {message}"));
    }

    pub fn is_loading(&self) -> bool {
        self.loader_visible
    }
}

pub fn humanize_metric_key(key: &str) -> String {
    key.replace('_', " ")
        .replacen("optimal angle range", "Rango de ángulo óptimo", 1)
        .replacen("training time s", "Tiempo de entrenamiento (s)", 1)
        .replacen("evaluation time s", "Tiempo de evaluación (s)", 1)
}

pub fn metric_rows(metrics: &Map<String, Value>) -> Vec<MetricRow> {
    metrics
        .iter()
        .map(|(k, v)| MetricRow {
            name: humanize_metric_key(k),
            value: display_json_value(v),
        })
        .collect()
}

pub fn report_table(data: Option<&ClassificationReportData>) -> ReportTable {
    let Some(data) = data else {
        return ReportTable {
            empty_message: Some(NO_REPORT_DATA.into()),
            ..Default::default()
        };
    };
    if data.data.is_empty() {
        return ReportTable {
            headers: data.headers.clone(),
            rows: Vec::new(),
            empty_message: Some(NO_REPORT_DATA.into()),
        };
    }
    let rows = data
        .data
        .iter()
        .map(|row| {
            data.headers
                .iter()
                .map(|h| report_cell(h, row.get(h)))
                .collect()
        })
        .collect();
    ReportTable {
        headers: data.headers.clone(),
        rows,
        empty_message: None,
    }
}

fn report_cell(header: &str, value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) if DECIMAL_COLUMNS.contains(&header) => match n.as_f64() {
            Some(f) => format!("{f:.2}"),
            None => n.to_string(),
        },
        Some(v) => display_json_value(v),
    }
}

pub fn prepare_reps(data: Option<&RepsChartData>) -> ChartSlot<BarChart> {
    let Some(d) = data.filter(|d| !d.values.is_empty()) else {
        return ChartSlot::Unavailable(REPS_UNAVAILABLE.into());
    };
    let bars = d
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| (d.labels.get(i).cloned().unwrap_or_default(), *v))
        .collect();
    ChartSlot::Rendered(BarChart {
        title: d
            .chart_title
            .clone()
            .unwrap_or_else(|| "Resultados de Repeticiones".into()),
        bars,
    })
}

pub fn prepare_confusion(data: Option<&ConfusionMatrixData>) -> ChartSlot<ConfusionGrid> {
    let Some(d) = data.filter(|d| {
        !d.matrix.is_empty() && !d.labels.is_empty() && !d.prediction_labels.is_empty()
    }) else {
        return ChartSlot::Unavailable(CONFUSION_UNAVAILABLE.into());
    };
    let max = d.matrix.iter().flatten().copied().max().unwrap_or(0);
    let cells = d
        .matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let actual = d.labels.get(i).cloned().unwrap_or_default();
            row.iter()
                .enumerate()
                .map(|(j, &value)| {
                    let predicted = d.prediction_labels.get(j).cloned().unwrap_or_default();
                    let diagonal = actual.replacen("Real ", "", 1)
                        == predicted.replacen("Pred. ", "", 1);
                    MatrixCell {
                        actual: actual.clone(),
                        predicted,
                        value,
                        intensity: if max > 0 {
                            value as f64 / max as f64
                        } else {
                            0.0
                        },
                        diagonal,
                    }
                })
                .collect()
        })
        .collect();
    ChartSlot::Rendered(ConfusionGrid {
        title: d.chart_title.clone().unwrap_or_default(),
        row_labels: d.labels.clone(),
        column_labels: d.prediction_labels.clone(),
        cells,
    })
}

pub fn prepare_roc(data: Option<&RocData>) -> ChartSlot<CurveChart> {
    let Some(d) = data.filter(|d| !d.fpr.is_empty() && !d.tpr.is_empty()) else {
        return ChartSlot::Unavailable(ROC_UNAVAILABLE.into());
    };
    ChartSlot::Rendered(CurveChart {
        title: format!(
            "{} (AUC: {:.4})",
            d.chart_title.as_deref().unwrap_or("Curva ROC"),
            d.auc
        ),
        x_label: "FPR".into(),
        y_label: "TPR".into(),
        points: d.fpr.iter().copied().zip(d.tpr.iter().copied()).collect(),
        reference: Some([(0.0, 0.0), (1.0, 1.0)]),
    })
}

pub fn prepare_pr(data: Option<&PrData>) -> ChartSlot<CurveChart> {
    let Some(d) = data.filter(|d| !d.recall.is_empty() && !d.precision.is_empty()) else {
        return ChartSlot::Unavailable(PR_UNAVAILABLE.into());
    };
    ChartSlot::Rendered(CurveChart {
        title: d
            .chart_title
            .clone()
            .unwrap_or_else(|| "Curva Precision-Recall".into()),
        x_label: "Recall".into(),
        y_label: "Precision".into(),
        points: d
            .recall
            .iter()
            .copied()
            .zip(d.precision.iter().copied())
            .collect(),
        reference: None,
    })
}
