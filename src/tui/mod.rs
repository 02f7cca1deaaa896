mod charts;
mod export;
mod help;

use crate::backend::HttpBackend;
use crate::cli::Cli;
use crate::controller::feedback::{MessageKind, QuestionKind, QUESTIONS};
use crate::controller::navigation::Section;
use crate::controller::view::{LiveSubView, PauseIcon, Severity, ViewState};
use crate::controller::{AppEvent, Controller};
use crate::model::ExerciseType;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Terminal,
};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// State that only the terminal front end needs.
#[derive(Default)]
struct UiState {
    /// Highlighted sidebar entry while the menu is open.
    menu_cursor: usize,
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = crate::cli::build_config(&args);
    let backend = Arc::new(HttpBackend::new(&cfg)?);
    let (ctrl, event_rx) = Controller::new(backend, tokio::runtime::Handle::current(), cfg);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(ctrl, event_rx));

    let pending_stop = match tokio::task::spawn_blocking(move || ui_handle.join()).await? {
        Ok(res) => res?,
        Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
    };
    // Let the backend hear about the stopped session before exiting.
    if let Some(stop) = pending_stop {
        let _ = stop.await;
    }
    Ok(())
}

/// Run the TUI loop on a dedicated thread. Returns the stop request of a
/// session that was still running at quit.
fn run_threaded(
    mut ctrl: Controller<HttpBackend>,
    mut event_rx: UnboundedReceiver<AppEvent>,
) -> Result<Option<JoinHandle<()>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut ui = UiState::default();
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            ctrl.handle_event(ev);
        }
        ctrl.tick();

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &ctrl, &ui)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
                    break Ok(ctrl.shutdown());
                }
                if ctrl.view().is_visible(Section::Feedback) && ctrl.view().feedback.editing {
                    handle_text_input(&mut ctrl, k.code);
                    continue;
                }
                if ctrl.view().sidebar_open && handle_menu_key(&mut ctrl, &mut ui, k.code) {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) => break Ok(ctrl.shutdown()),
                    (_, KeyCode::F(n @ 1..=5)) => {
                        ctrl.navigate_to(Section::ALL[usize::from(n) - 1].nav_key());
                    }
                    (_, KeyCode::Char('m')) => {
                        ui.menu_cursor = ctrl
                            .view()
                            .active_nav
                            .and_then(|s| Section::ALL.iter().position(|x| *x == s))
                            .unwrap_or(0);
                        ctrl.toggle_sidebar();
                    }
                    (_, KeyCode::Backspace) => ctrl.go_back(),
                    (_, KeyCode::Esc) => {
                        if ctrl.view().live.fullscreen {
                            ctrl.toggle_fullscreen();
                        } else {
                            ctrl.dismiss_notification();
                        }
                    }
                    (_, code) => {
                        let visible = ctrl.view().visible;
                        match visible {
                            Some(Section::LiveDetection) => handle_live_key(&mut ctrl, code),
                            Some(Section::Analysis) => handle_analysis_key(&mut ctrl, code),
                            Some(Section::Feedback) => handle_feedback_key(&mut ctrl, code),
                            _ => {}
                        }
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn exercise_key(code: KeyCode) -> Option<ExerciseType> {
    match code {
        KeyCode::Char(c) => c
            .to_digit(10)
            .and_then(|d| ExerciseType::from_menu_index(d as usize)),
        _ => None,
    }
}

/// Sidebar navigation while the menu is open. Returns whether the key was used.
fn handle_menu_key(ctrl: &mut Controller<HttpBackend>, ui: &mut UiState, code: KeyCode) -> bool {
    match code {
        KeyCode::Up | KeyCode::Char('k') => {
            ui.menu_cursor = (ui.menu_cursor + Section::ALL.len() - 1) % Section::ALL.len();
        }
        KeyCode::Down | KeyCode::Char('j') => {
            ui.menu_cursor = (ui.menu_cursor + 1) % Section::ALL.len();
        }
        KeyCode::Enter => ctrl.navigate_to(Section::ALL[ui.menu_cursor].nav_key()),
        KeyCode::Esc | KeyCode::Char('m') => ctrl.toggle_sidebar(),
        _ => return false,
    }
    true
}

fn handle_live_key(ctrl: &mut Controller<HttpBackend>, code: KeyCode) {
    if let Some(exercise) = exercise_key(code) {
        ctrl.start_live_session(exercise);
        return;
    }
    match code {
        KeyCode::Char('p') | KeyCode::Char(' ') => ctrl.toggle_pause(),
        KeyCode::Char('x') => ctrl.stop_live_session(),
        KeyCode::Char('f') => ctrl.toggle_fullscreen(),
        _ => {}
    }
}

fn handle_analysis_key(ctrl: &mut Controller<HttpBackend>, code: KeyCode) {
    if let Some(exercise) = exercise_key(code) {
        ctrl.start_analysis(exercise);
        return;
    }
    match code {
        KeyCode::Char('e') => export::export_charts(ctrl),
        KeyCode::Char('c') => export::export_report(ctrl),
        KeyCode::Char('y') => export::copy_last_export(ctrl),
        _ => {}
    }
}

fn handle_feedback_key(ctrl: &mut Controller<HttpBackend>, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => ctrl.feedback_form_mut().select_prev(),
        KeyCode::Down | KeyCode::Char('j') => ctrl.feedback_form_mut().select_next(),
        KeyCode::Left | KeyCode::Char('h') => ctrl.feedback_form_mut().cycle_option(-1),
        KeyCode::Right | KeyCode::Char('l') => ctrl.feedback_form_mut().cycle_option(1),
        KeyCode::Enter => ctrl.feedback_form_mut().toggle_editing(),
        KeyCode::Char('s') => ctrl.submit_feedback(),
        _ => {}
    }
}

fn handle_text_input(ctrl: &mut Controller<HttpBackend>, code: KeyCode) {
    let form = ctrl.feedback_form_mut();
    match code {
        KeyCode::Enter | KeyCode::Esc => form.toggle_editing(),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) => form.push_char(c),
        KeyCode::Up => form.select_prev(),
        KeyCode::Down => form.select_next(),
        _ => {}
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, ctrl: &Controller<HttpBackend>, ui: &UiState) {
    let view = ctrl.view();
    if view.live.fullscreen && view.is_visible(Section::LiveDetection) {
        return draw_live_video(area, f, ctrl);
    }

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(0)].as_ref())
        .split(area);
    draw_sidebar(cols[0], f, view, ui);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(cols[1]);
    draw_header(rows[0], f, ctrl);

    match view.visible {
        Some(Section::Home) => draw_home(rows[1], f),
        Some(Section::LiveDetection) => draw_live(rows[1], f, ctrl),
        Some(Section::Analysis) => draw_analysis(rows[1], f, view),
        Some(Section::Help) => help::draw_help(rows[1], f),
        Some(Section::Feedback) => draw_feedback(rows[1], f, view),
        None => {
            let p = Paragraph::new("Sección no encontrada. Usa F1-F5 o Backspace.")
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, rows[1]);
        }
    }

    draw_notification(rows[2], f, view);
}

fn draw_sidebar(area: Rect, f: &mut ratatui::Frame, view: &ViewState, ui: &UiState) {
    let mut lines = Vec::with_capacity(Section::ALL.len() + 2);
    for (i, section) in Section::ALL.iter().enumerate() {
        let active = view.active_nav == Some(*section);
        let mut style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        if view.sidebar_open && ui.menu_cursor == i {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(vec![
            Span::styled(format!("F{} ", i + 1), Style::default().fg(Color::Magenta)),
            Span::styled(section.label(), style),
        ]));
    }

    let border = if view.sidebar_open {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("pose-coach"),
    );
    f.render_widget(p, area);
}

fn draw_header(area: Rect, f: &mut ratatui::Frame, ctrl: &Controller<HttpBackend>) {
    let view = ctrl.view();
    let earlier = ctrl
        .history()
        .entries()
        .split_last()
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    let mut spans = Vec::with_capacity(earlier.len() * 2 + 3);
    for entry in earlier {
        spans.push(Span::styled(
            entry.breadcrumb_label.clone(),
            Style::default().fg(Color::DarkGray),
        ));
        spans.push(Span::styled(" › ", Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::styled(
        view.breadcrumb.clone(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    if view.back_visible {
        spans.push(Span::raw("   "));
        spans.push(Span::styled("⌫ Volver", Style::default().fg(Color::Gray)));
    }
    let p = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_notification(area: Rect, f: &mut ratatui::Frame, view: &ViewState) {
    let p = match view.notification.as_ref() {
        Some(n) => {
            let color = match n.severity {
                Severity::Error => Color::Red,
                Severity::Warning => Color::Yellow,
                Severity::Success => Color::Green,
                Severity::Info => Color::Cyan,
            };
            Paragraph::new(Line::from(vec![
                Span::styled(
                    format!("{}: ", n.title),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(n.body.clone()),
            ]))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .title("Esc para cerrar"),
            )
        }
        None => Paragraph::new("F1-F5 secciones · m menú · Backspace volver · q salir")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL)),
    };
    f.render_widget(p, area);
}

fn draw_home(area: Rect, f: &mut ratatui::Frame) {
    let p = Paragraph::new(vec![
        Line::from(Span::styled(
            "Bienvenido a pose-coach",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Cuenta repeticiones y detecta errores de postura en tiempo real."),
        Line::from(""),
        Line::from(vec![
            Span::styled("F2 ", Style::default().fg(Color::Magenta)),
            Span::raw("Detección en Vivo: elige un ejercicio y empieza a entrenar."),
        ]),
        Line::from(vec![
            Span::styled("F3 ", Style::default().fg(Color::Magenta)),
            Span::raw("Análisis: métricas, reporte y gráficos del modelo."),
        ]),
        Line::from(vec![
            Span::styled("F4 ", Style::default().fg(Color::Magenta)),
            Span::raw("Ayuda: atajos de teclado."),
        ]),
        Line::from(vec![
            Span::styled("F5 ", Style::default().fg(Color::Magenta)),
            Span::raw("Encuesta: cuéntanos qué te pareció."),
        ]),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Inicio"));
    f.render_widget(p, area);
}

fn exercise_menu(prompt: &str) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(prompt.to_string()), Line::from("")];
    for (i, ex) in ExerciseType::ALL.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{}", i + 1), Style::default().fg(Color::Magenta)),
            Span::raw(format!("  {}", ex.label())),
        ]));
    }
    lines
}

fn draw_live(area: Rect, f: &mut ratatui::Frame, ctrl: &Controller<HttpBackend>) {
    match ctrl.view().live.sub_view {
        LiveSubView::Selection => {
            let p = Paragraph::new(exercise_menu("Selecciona un ejercicio para iniciar la detección:"))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(Section::LiveDetection.label()),
                );
            f.render_widget(p, area);
        }
        LiveSubView::Video => draw_live_video(area, f, ctrl),
    }
}

fn draw_live_video(area: Rect, f: &mut ratatui::Frame, ctrl: &Controller<HttpBackend>) {
    let live = &ctrl.view().live;
    let exercise = ctrl.live_exercise().map(ExerciseType::label).unwrap_or_default();
    let icon = match live.pause_icon {
        PauseIcon::Pause => "⏸",
        PauseIcon::Play => "▶",
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(5)].as_ref())
        .split(area);

    let feed = (if live.loader_visible {
        Paragraph::new(vec![Line::from(""), Line::from("Cargando video...")])
            .style(Style::default().fg(Color::Yellow))
    } else {
        Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("{} frames", live.frames),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("{:.1} MB recibidos", live.stream_bytes as f64 / 1_000_000.0)),
        ])
    })
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Cámara · {exercise} {icon}"))
            .title_bottom(if live.fullscreen {
                "f/Esc salir de pantalla completa"
            } else {
                "p pausa · x detener · f pantalla completa"
            }),
    );
    f.render_widget(feed, chunks[0]);

    let status_color = if live.status.starts_with("Error") {
        Color::Red
    } else {
        Color::Cyan
    };
    let counters = Paragraph::new(vec![
        Line::from(vec![
            Span::raw("Estado: "),
            Span::styled(live.status.clone(), Style::default().fg(status_color)),
        ]),
        Line::from(vec![
            Span::raw("Repeticiones: "),
            Span::styled(live.counters.reps.to_string(), Style::default().fg(Color::Green)),
            Span::raw("   Incorrectas: "),
            Span::styled(
                live.counters.incorrect_reps.to_string(),
                Style::default().fg(Color::Red),
            ),
        ]),
        Line::from(vec![
            Span::raw("Etapa: "),
            Span::styled(live.counters.stage.clone(), Style::default().fg(Color::Yellow)),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title(if ctrl.is_polling() {
        "Contadores ● en vivo"
    } else {
        "Contadores"
    }));
    f.render_widget(counters, chunks[1]);
}

fn draw_analysis(area: Rect, f: &mut ratatui::Frame, view: &ViewState) {
    let analysis = &view.analysis;
    let title = match analysis.exercise {
        Some(ex) => format!("Análisis: {}", ex.label()),
        None => Section::Analysis.label().to_string(),
    };

    if analysis.menu_visible {
        let p = Paragraph::new(exercise_menu("Selecciona un ejercicio para analizar:"))
            .block(Block::default().borders(Borders::ALL).title(title));
        return f.render_widget(p, area);
    }
    if analysis.is_loading() {
        let p = Paragraph::new("Analizando... puede tardar mientras se entrena el modelo.")
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));
        return f.render_widget(p, area);
    }
    if let Some(err) = analysis.error.as_deref() {
        let p = Paragraph::new(vec![
            Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red))),
            Line::from(""),
            Line::from("1-4 para analizar otro ejercicio."),
        ])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
        return f.render_widget(p, area);
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)].as_ref())
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(rows[0]);

    let metrics: Vec<Line> = analysis
        .metrics
        .iter()
        .flatten()
        .map(|m| {
            Line::from(vec![
                Span::styled(format!("{}: ", m.name), Style::default().fg(Color::Gray)),
                Span::raw(m.value.clone()),
            ])
        })
        .collect();
    let p = Paragraph::new(metrics)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, top[0]);

    let mut report_lines = Vec::new();
    match analysis.report.as_ref() {
        Some(report) if report.empty_message.is_none() => {
            let widths: Vec<usize> = (0..report.headers.len())
                .map(|i| {
                    report
                        .rows
                        .iter()
                        .filter_map(|r| r.get(i))
                        .chain(report.headers.get(i))
                        .map(|c| c.chars().count())
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
            };
            report_lines.push(Line::from(Span::styled(
                fmt_row(report.headers.as_slice()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for row in &report.rows {
                report_lines.push(Line::from(fmt_row(row.as_slice())));
            }
        }
        Some(report) => {
            let msg = report.empty_message.clone().unwrap_or_default();
            report_lines.push(Line::from(Span::styled(msg, Style::default().fg(Color::Yellow))));
        }
        None => {}
    }
    if let Some(path) = analysis.last_export.as_ref() {
        report_lines.push(Line::from(""));
        report_lines.push(Line::from(Span::styled(
            format!("Última exportación: {}", path.display()),
            Style::default().fg(Color::DarkGray),
        )));
    }
    let p = Paragraph::new(report_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Reporte de Clasificación")
            .title_bottom("e gráficos · c CSV · y copiar ruta"),
    );
    f.render_widget(p, top[1]);

    if let Some(charts) = analysis.charts.as_ref() {
        charts::draw_chart_grid(f, rows[1], charts);
    }
}

fn draw_feedback(area: Rect, f: &mut ratatui::Frame, view: &ViewState) {
    let form = &view.feedback;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    let mut lines = Vec::with_capacity(QUESTIONS.len() * 2);
    for (i, (q, a)) in QUESTIONS.iter().zip(&form.answers).enumerate() {
        let selected = i == form.selected;
        let marker = if selected { "›" } else { " " };
        let q_style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{marker} {:>2}. ", i + 1)),
            Span::styled(q.text, q_style),
        ]));

        let mut answer = vec![Span::raw("       ")];
        for (j, opt) in q.options().iter().enumerate() {
            let style = if a.choice == Some(j) {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::Gray)
            };
            answer.push(Span::styled(format!(" {opt} "), style));
            answer.push(Span::raw(" "));
        }
        let shows_text = match q.kind {
            QuestionKind::Text => true,
            QuestionKind::YesNoDetails { .. } => a.choice == Some(0),
            QuestionKind::Choice(_) => false,
        };
        if shows_text {
            let label = match q.kind {
                QuestionKind::YesNoDetails { details_label, .. } => format!("{details_label}: "),
                _ => String::new(),
            };
            let cursor = if selected && form.editing { "▌" } else { "" };
            answer.push(Span::styled(label, Style::default().fg(Color::Gray)));
            answer.push(Span::styled(
                format!("{}{cursor}", a.text),
                Style::default().fg(Color::White).add_modifier(Modifier::UNDERLINED),
            ));
        }
        lines.push(Line::from(answer));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Section::Feedback.label())
            .title_bottom("↑/↓ pregunta · ←/→ respuesta · Enter escribir · s enviar"),
    );
    f.render_widget(p, chunks[0]);

    let status = if form.submitting {
        Paragraph::new("Enviando...").style(Style::default().fg(Color::Yellow))
    } else if let Some(msg) = form.message.as_ref() {
        let color = match msg.kind {
            MessageKind::Success => Color::Green,
            MessageKind::Error => Color::Red,
        };
        Paragraph::new(msg.text.clone()).style(Style::default().fg(color))
    } else {
        Paragraph::new("")
    };
    f.render_widget(status.block(Block::default().borders(Borders::ALL)), chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_keys_map_to_exercises() {
        assert_eq!(exercise_key(KeyCode::Char('1')), Some(ExerciseType::Squats));
        assert_eq!(exercise_key(KeyCode::Char('4')), Some(ExerciseType::ShoulderPress));
        assert_eq!(exercise_key(KeyCode::Char('0')), None);
        assert_eq!(exercise_key(KeyCode::Char('5')), None);
        assert_eq!(exercise_key(KeyCode::Enter), None);
    }
}
