//! Writing analysis exports to disk.

use crate::controller::analysis::{ChartKind, ChartSet, ReportTable};
use crate::model::ExerciseType;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Timestamp used in export file names, local time when available.
fn file_timestamp() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let fmt = time::macros::format_description!("[year][month][day]-[hour][minute][second]");
    now.format(fmt)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

fn export_path(dir: &Path, exercise: ExerciseType, what: &str, ext: &str) -> PathBuf {
    dir.join(format!(
        "pose-coach-{}-{what}-{}.{ext}",
        exercise.as_str(),
        file_timestamp()
    ))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))
}

/// Outcome of exporting every chart slot.
#[derive(Debug, Default)]
pub struct ChartExport {
    pub written: Vec<PathBuf>,
    pub missing: Vec<ChartKind>,
}

/// Write each rendered chart as pretty JSON. Slots without a chart are
/// reported in `missing`.
pub fn export_charts(dir: &Path, exercise: ExerciseType, charts: &ChartSet) -> Result<ChartExport> {
    ensure_dir(dir)?;
    let mut out = ChartExport::default();
    for kind in ChartKind::ALL {
        let Some(value) = charts.export_value(kind) else {
            out.missing.push(kind);
            continue;
        };
        let path = export_path(dir, exercise, kind.chart_id(), "json");
        let body = serde_json::to_vec_pretty(&value)?;
        std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
        out.written.push(path);
    }
    Ok(out)
}

/// Write the classification report as CSV.
pub fn export_report_csv(dir: &Path, exercise: ExerciseType, report: &ReportTable) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = export_path(dir, exercise, "classification-report", "csv");
    let mut w = csv::Writer::from_path(&path)
        .with_context(|| format!("create {}", path.display()))?;
    w.write_record(&report.headers)?;
    for row in &report.rows {
        w.write_record(row)?;
    }
    w.flush()?;
    Ok(path)
}
