//! Text output for the headless modes.
//!
//! Formats analysis results and live counters as plain lines.

use crate::controller::analysis::{self, ChartSet, ChartSlot};
use crate::controller::session::Counters;
use crate::model::{AnalysisResponse, ExerciseType};
use anyhow::{bail, Result};

/// Pre-formatted lines for text output.
#[derive(Debug)]
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build the text report of a successful analysis. A non-success payload is
/// returned as an error carrying the backend's message.
pub(crate) fn build_analysis_summary(
    exercise: ExerciseType,
    response: &AnalysisResponse,
) -> Result<TextSummary> {
    if !response.is_success() {
        bail!(
            "Error en el análisis: {}",
            response.error.as_deref().unwrap_or("Mensaje desconocido")
        );
    }
    let mut lines = vec![format!("Análisis: {} ({})", exercise.label(), exercise.as_str())];

    lines.push(String::new());
    lines.push("Métricas:".into());
    let metrics = analysis::metric_rows(&response.metrics);
    let width = metrics.iter().map(|m| m.name.chars().count()).max().unwrap_or(0);
    for m in metrics {
        lines.push(format!("  {:<width$}  {}", m.name, m.value));
    }

    lines.push(String::new());
    lines.push("Reporte de clasificación:".into());
    let report = analysis::report_table(response.classification_report_data.as_ref());
    if let Some(msg) = report.empty_message.as_deref() {
        lines.push(format!("  {msg}"));
    } else {
        let widths: Vec<usize> = report
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                report
                    .rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let fmt_row = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{c:<w$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };
        lines.push(format!("  {}", fmt_row(report.headers.as_slice())));
        for row in &report.rows {
            lines.push(format!("  {}", fmt_row(row.as_slice())));
        }
    }

    lines.push(String::new());
    lines.push("Gráficos:".into());
    lines.extend(chart_lines(&ChartSet::from_response(response)));
    Ok(TextSummary { lines })
}

fn chart_lines(charts: &ChartSet) -> Vec<String> {
    let mut lines = Vec::new();
    match &charts.reps {
        ChartSlot::Rendered(c) => {
            let bars: Vec<String> = c.bars.iter().map(|(l, v)| format!("{l} {v}")).collect();
            lines.push(format!("  {}: {}", c.title, bars.join(", ")));
        }
        ChartSlot::Unavailable(msg) => lines.push(format!("  {msg}")),
        ChartSlot::Empty => {}
    }
    match &charts.confusion {
        ChartSlot::Rendered(grid) => {
            lines.push(format!(
                "  {} [{}]",
                if grid.title.is_empty() { "Matriz de confusión" } else { grid.title.as_str() },
                grid.column_labels.join(" | ")
            ));
            for (label, row) in grid.row_labels.iter().zip(&grid.cells) {
                let values: Vec<String> = row.iter().map(|c| c.value.to_string()).collect();
                lines.push(format!("    {label}: {}", values.join(" ")));
            }
        }
        ChartSlot::Unavailable(msg) => lines.push(format!("  {msg}")),
        ChartSlot::Empty => {}
    }
    for slot in [&charts.roc, &charts.pr] {
        match slot {
            ChartSlot::Rendered(c) => {
                lines.push(format!("  {} ({} puntos)", c.title, c.points.len()))
            }
            ChartSlot::Unavailable(msg) => lines.push(format!("  {msg}")),
            ChartSlot::Empty => {}
        }
    }
    lines
}

/// One status line of a headless live session.
pub(crate) fn counters_line(status: &str, counters: &Counters, frames: u64) -> String {
    format!(
        "{status} | reps {} | incorrectas {} | etapa {} | frames {frames}",
        counters.reps, counters.incorrect_reps, counters.stage
    )
}
