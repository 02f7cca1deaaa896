use crate::backend::Backend;
use crate::controller::analysis::NO_REPORT_DATA;
use crate::controller::view::Notification;
use crate::controller::Controller;
use anyhow::Result;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

const EXPORT_FAILED_TITLE: &str = "Descarga Fallida";
const EXPORT_FAILED_BODY: &str =
    "No se pudo descargar el gráfico. Asegúrate de que el análisis se haya completado.";

// Clipboard manager channel, started on first copy
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Write every rendered chart of the current analysis to the export directory.
pub fn export_charts<B: Backend>(ctrl: &mut Controller<B>) {
    let view = &ctrl.view().analysis;
    let outcome = match (view.exercise, view.charts.as_ref()) {
        (Some(exercise), Some(charts)) => Some(crate::storage::export_charts(
            &ctrl.config().export_dir,
            exercise,
            charts,
        )),
        _ => None,
    };

    match outcome {
        Some(Ok(exported)) if !exported.written.is_empty() => {
            tracing::info!(files = exported.written.len(), "charts exported");
            let mut body = format!(
                "{} gráfico(s) guardado(s) en {} (y para copiar la ruta)",
                exported.written.len(),
                ctrl.config().export_dir.display()
            );
            if !exported.missing.is_empty() {
                body.push_str(&format!("; {} sin datos", exported.missing.len()));
            }
            let dir = ctrl.config().export_dir.clone();
            ctrl.set_last_export(dir);
            ctrl.notify(Notification::success("Gráficos Exportados", body));
        }
        Some(Err(e)) => {
            tracing::warn!(error = %format!("{e:#}"), "chart export failed");
            ctrl.notify(Notification::error(EXPORT_FAILED_TITLE, format!("{e:#}")));
        }
        _ => ctrl.notify(Notification::warning(EXPORT_FAILED_TITLE, EXPORT_FAILED_BODY)),
    }
}

/// Write the classification report of the current analysis as CSV.
pub fn export_report<B: Backend>(ctrl: &mut Controller<B>) {
    let view = &ctrl.view().analysis;
    let outcome = match (view.exercise, view.report.as_ref()) {
        (Some(exercise), Some(report)) if report.empty_message.is_none() => Some(
            crate::storage::export_report_csv(&ctrl.config().export_dir, exercise, report),
        ),
        _ => None,
    };

    match outcome {
        Some(Ok(path)) => {
            tracing::info!(path = %path.display(), "report exported");
            let body = format!("{} (y para copiar la ruta)", path.display());
            ctrl.set_last_export(path);
            ctrl.notify(Notification::success("Reporte Exportado", body));
        }
        Some(Err(e)) => {
            tracing::warn!(error = %format!("{e:#}"), "report export failed");
            ctrl.notify(Notification::error(EXPORT_FAILED_TITLE, format!("{e:#}")));
        }
        None => ctrl.notify(Notification::warning(EXPORT_FAILED_TITLE, NO_REPORT_DATA)),
    }
}

/// Copy the last exported path to the clipboard.
pub fn copy_last_export<B: Backend>(ctrl: &mut Controller<B>) {
    let Some(path) = ctrl.view().analysis.last_export.clone() else {
        ctrl.notify(Notification::info(
            "Portapapeles",
            "No hay ninguna ruta exportada. Exporta primero (e/c).",
        ));
        return;
    };
    let path = path.to_string_lossy().to_string();
    match copy_to_clipboard(&path) {
        Ok(()) => {
            let display_path = if path.chars().count() > 60 {
                format!("{}...", path.chars().take(57).collect::<String>())
            } else {
                path
            };
            ctrl.notify(Notification::success("Portapapeles", format!("Copiado: {display_path}")));
        }
        Err(e) => ctrl.notify(Notification::error("Portapapeles", format!("{e:#}"))),
    }
}

/// Start the clipboard thread once. Each copy keeps its `Clipboard` alive for
/// a while so clipboard managers on Linux can read it.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if clipboard.set_text(&text).is_ok() {
                            std::thread::sleep(Duration::from_secs(2));
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard thread and return immediately.
fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}

