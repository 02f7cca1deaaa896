use crate::backend::{Backend, HttpBackend};
use crate::controller::navigation::Section;
use crate::controller::session::{Counters, LiveSessionState};
use crate::controller::{analysis, Controller};
use crate::model::{AppConfig, ExerciseType};
use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "pose-coach",
    version,
    about = "Live exercise pose detection and training analysis client with optional TUI"
)]
pub struct Cli {
    /// Base URL of the pose detection backend
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Interval between counter polls during a live session
    #[arg(long, default_value = "500ms")]
    pub poll_interval: humantime::Duration,

    /// Timeout for short requests (counters, pause, stop, feedback)
    #[arg(long, default_value = "10s")]
    pub request_timeout: humantime::Duration,

    /// Directory for chart and report exports
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Log file used while the TUI is running
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Run the analysis for an exercise, print it and exit (no TUI)
    #[arg(long, value_enum, conflicts_with = "exercise")]
    pub analyze: Option<ExerciseType>,

    /// Print the raw analysis JSON instead of the text report
    #[arg(long, requires = "analyze")]
    pub json: bool,

    /// Also write chart JSON and the report CSV to the export directory
    #[arg(long, requires = "analyze")]
    pub export: bool,

    /// Start a live session for an exercise without the TUI
    #[arg(long, value_enum, requires = "text")]
    pub exercise: Option<ExerciseType>,

    /// Print live counters as text lines (used with --exercise)
    #[arg(long, requires = "exercise")]
    pub text: bool,

    /// Stop the headless live session after this long (default: until Ctrl-C)
    #[arg(long, requires = "exercise")]
    pub duration: Option<humantime::Duration>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.analyze.is_some() || self.exercise.is_some()
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if let Some(exercise) = args.analyze {
        crate::logging::init_stderr(&args.log_level)?;
        return run_analyze(&args, exercise).await;
    }
    if let Some(exercise) = args.exercise {
        crate::logging::init_stderr(&args.log_level)?;
        return run_live_text(&args, exercise).await;
    }

    #[cfg(feature = "tui")]
    {
        if let Some(path) = args.log_file.clone().or_else(crate::logging::default_log_file) {
            crate::logging::init_file(&args.log_level, &path)?;
        }
        return crate::tui::run(args).await;
    }
    #[cfg(not(feature = "tui"))]
    {
        return Err(anyhow!(
            "built without TUI support; use --analyze <exercise> or --exercise <exercise> --text"
        ));
    }
}

fn default_export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pose-coach")
}

/// Build an `AppConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> AppConfig {
    let cfg = AppConfig {
        base_url: args.base_url.clone(),
        poll_interval: Duration::from(args.poll_interval),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("pose-coach/{}", env!("CARGO_PKG_VERSION")),
        export_dir: args.export_dir.clone().unwrap_or_else(default_export_dir),
    };
    match serde_json::to_string(&cfg) {
        Ok(json) => tracing::debug!(config = %json, "effective configuration"),
        Err(e) => tracing::warn!(error = %e, "configuration not serializable"),
    }
    cfg
}

async fn run_analyze(args: &Cli, exercise: ExerciseType) -> Result<()> {
    let cfg = build_config(args);
    let backend = HttpBackend::new(&cfg)?;
    let (out_tx, out_handle) = spawn_output_writer();
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "Analizando {}... (puede tardar mientras se entrena el modelo)",
        exercise.label()
    )));

    let outcome = analyze_and_print(args, &cfg, &backend, exercise, &out_tx).await;

    drop(out_tx);
    let _ = out_handle.await;
    outcome
}

async fn analyze_and_print(
    args: &Cli,
    cfg: &AppConfig,
    backend: &HttpBackend,
    exercise: ExerciseType,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let response = backend
        .analyze(exercise)
        .await
        .map_err(|e| anyhow!("Error de conexión o del servidor: {}", e.user_message()))?;

    if args.export && response.is_success() {
        let charts = analysis::ChartSet::from_response(&response);
        let exported = crate::storage::export_charts(&cfg.export_dir, exercise, &charts)?;
        for p in &exported.written {
            let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
        }
        let report = analysis::report_table(response.classification_report_data.as_ref());
        if report.empty_message.is_none() {
            let p = crate::storage::export_report_csv(&cfg.export_dir, exercise, &report)?;
            let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
        }
    }

    if args.json {
        let out = serde_json::to_string_pretty(&response)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
        if !response.is_success() {
            return Err(anyhow!(
                "Error en el análisis: {}",
                response.error.as_deref().unwrap_or("Mensaje desconocido")
            ));
        }
        return Ok(());
    }

    let summary = crate::text_summary::build_analysis_summary(exercise, &response)?;
    for line in summary.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }
    Ok(())
}

/// Drive a live session through the controller and print counter changes.
async fn run_live_text(args: &Cli, exercise: ExerciseType) -> Result<()> {
    let cfg = build_config(args);
    let backend = Arc::new(HttpBackend::new(&cfg)?);
    let (mut ctrl, mut rx) = Controller::new(backend, tokio::runtime::Handle::current(), cfg);
    let (out_tx, out_handle) = spawn_output_writer();

    let deadline = args
        .duration
        .map(|d| tokio::time::Instant::now() + Duration::from(d));

    ctrl.navigate_to(Section::LiveDetection.nav_key());
    ctrl.start_live_session(exercise);
    let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", exercise.label())));

    let mut last: Option<(String, Counters)> = None;
    let mut best = Counters::idle();
    let mut failed = None;

    loop {
        tokio::select! {
            ev = rx.recv() => {
                let Some(ev) = ev else { break };
                ctrl.handle_event(ev);

                if let Some(n) = ctrl.view().notification.clone() {
                    ctrl.dismiss_notification();
                    let _ = out_tx.send(OutputLine::Stderr(format!("{}: {}", n.title, n.body)));
                }
                if ctrl.live_state() == LiveSessionState::Error {
                    failed = Some(ctrl.view().live.status.clone());
                    break;
                }

                let live = &ctrl.view().live;
                let current = (live.status.clone(), live.counters.clone());
                if last.as_ref() != Some(&current) {
                    let _ = out_tx.send(OutputLine::Stdout(crate::text_summary::counters_line(
                        &live.status,
                        &live.counters,
                        live.frames,
                    )));
                    if ctrl.live_state() == LiveSessionState::Detecting {
                        best = live.counters.clone();
                    }
                    last = Some(current);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
            _ = async {
                match deadline {
                    Some(d) => tokio::time::sleep_until(d).await,
                    None => futures::future::pending::<()>().await,
                }
            } => break,
        }
    }

    if let Some(stop) = ctrl.shutdown() {
        let _ = stop.await;
    }
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "Sesión finalizada: reps {}, incorrectas {}",
        best.reps, best.incorrect_reps
    )));
    drop(out_tx);
    let _ = out_handle.await;

    match failed {
        Some(status) => Err(anyhow!(
            "live session failed ({status}) streaming {}/video_feed/{}",
            args.base_url.trim_end_matches('/'),
            exercise.as_str()
        )),
        None => Ok(()),
    }
}
