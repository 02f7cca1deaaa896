use super::view::{LiveSubView, PauseIcon, Severity};
use super::*;
use crate::backend::mock::{MockBackend, StreamScript};
use crate::model::{
    ClassificationReportData, ConfusionMatrixData, PrData, RepsChartData, RocData,
};
use std::sync::atomic::Ordering;
use std::time::Duration;

type TestController = Controller<MockBackend>;

fn controller() -> (TestController, UnboundedReceiver<AppEvent>, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend::default());
    let (ctrl, rx) = Controller::new(backend.clone(), Handle::current(), AppConfig::default());
    (ctrl, rx, backend)
}

/// Let spawned tasks run for `dur` of (paused) time, then apply every event
/// they produced.
async fn settle(ctrl: &mut TestController, rx: &mut UnboundedReceiver<AppEvent>, dur: Duration) {
    tokio::time::sleep(dur).await;
    while let Ok(ev) = rx.try_recv() {
        ctrl.handle_event(ev);
    }
}

const SHORT: Duration = Duration::from_millis(10);

#[tokio::test(start_paused = true)]
async fn starts_on_home_with_single_entry() {
    let (ctrl, _rx, _b) = controller();
    assert_eq!(ctrl.view().visible, Some(Section::Home));
    assert_eq!(ctrl.view().active_nav, Some(Section::Home));
    assert_eq!(ctrl.history().len(), 1);
    assert!(!ctrl.view().back_visible);
    assert_eq!(ctrl.view().breadcrumb, "Inicio");
}

#[tokio::test(start_paused = true)]
async fn exactly_one_section_visible_after_navigation() {
    let (mut ctrl, _rx, _b) = controller();
    for section in Section::ALL {
        ctrl.navigate_to(section.nav_key());
        assert_eq!(ctrl.view().visible, Some(section));
        for other in Section::ALL {
            assert_eq!(ctrl.view().is_visible(other), other == section);
        }
    }
    assert_eq!(ctrl.view().active_nav, Some(Section::Feedback));
    assert!(ctrl.view().back_visible);
}

#[tokio::test(start_paused = true)]
async fn unknown_section_hides_everything() {
    let (mut ctrl, _rx, _b) = controller();
    let err = ctrl.show_section("stats-content", "Stats", true).unwrap_err();
    assert_eq!(err, NavigationError::SectionNotFound("stats-content".into()));
    assert_eq!(ctrl.view().visible, None);
    assert_eq!(ctrl.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reselecting_current_section_only_closes_sidebar() {
    let (mut ctrl, _rx, _b) = controller();
    ctrl.navigate_to("help");
    ctrl.toggle_sidebar();
    assert!(ctrl.view().sidebar_open);
    ctrl.navigate_to("help");
    assert!(!ctrl.view().sidebar_open);
    assert_eq!(ctrl.history().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn go_back_walks_history_then_resets_to_home() {
    let (mut ctrl, _rx, _b) = controller();
    ctrl.navigate_to("help");
    ctrl.navigate_to("analysis");
    assert_eq!(ctrl.history().len(), 3);

    ctrl.go_back();
    assert_eq!(ctrl.view().visible, Some(Section::Help));
    assert_eq!(ctrl.view().active_nav, Some(Section::Help));
    assert_eq!(ctrl.view().breadcrumb, "Ayuda");
    assert!(ctrl.view().back_visible);

    ctrl.go_back();
    assert_eq!(ctrl.view().visible, Some(Section::Home));
    assert!(!ctrl.view().back_visible);
    assert_eq!(ctrl.history().len(), 1);

    // At depth one, back shows home and empties the history.
    ctrl.go_back();
    assert_eq!(ctrl.view().visible, Some(Section::Home));
    assert_eq!(ctrl.view().active_nav, Some(Section::Home));
    assert!(ctrl.history().is_empty());

    ctrl.go_back();
    assert_eq!(ctrl.view().visible, Some(Section::Home));
    assert!(ctrl.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stream_ready_enters_detecting_with_initial_counters() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Squats);

    assert_eq!(ctrl.live_state(), LiveSessionState::Loading);
    assert_eq!(ctrl.view().live.counters, Counters::initializing());
    assert_eq!(ctrl.view().live.sub_view, LiveSubView::Video);
    assert!(ctrl.view().live.loader_visible);
    assert!(!ctrl.intentional_stop());

    settle(&mut ctrl, &mut rx, SHORT).await;
    assert_eq!(ctrl.live_state(), LiveSessionState::Detecting);
    assert!(!ctrl.view().live.loader_visible);
    assert_eq!(ctrl.view().live.status, view::STATUS_DETECTING);
    assert_eq!(ctrl.view().live.pause_icon, PauseIcon::Pause);
    assert_eq!(ctrl.view().live.counters.stage, "Inicializando...");
    assert_eq!(ctrl.view().live.frames, 1);
    assert!(ctrl.is_polling());
    assert_eq!(backend.streams_opened.load(Ordering::SeqCst), 1);

    settle(&mut ctrl, &mut rx, Duration::from_millis(480)).await;
    assert_eq!(ctrl.view().live.counters, Counters::initializing());
    assert_eq!(backend.data_fetches.load(Ordering::SeqCst), 0);

    settle(&mut ctrl, &mut rx, Duration::from_millis(30)).await;
    assert_eq!(backend.data_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(ctrl.view().live.counters.reps, 4);
    assert_eq!(ctrl.view().live.counters.incorrect_reps, 1);
    assert_eq!(ctrl.view().live.counters.stage, "up");
}

#[tokio::test(start_paused = true)]
async fn restart_keeps_a_single_polling_timer() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;
    ctrl.start_live_session(ExerciseType::Pushups);
    settle(&mut ctrl, &mut rx, SHORT).await;
    assert_eq!(ctrl.live_state(), LiveSessionState::Detecting);
    assert_eq!(ctrl.live_exercise(), Some(ExerciseType::Pushups));

    let before = backend.fetches();
    settle(&mut ctrl, &mut rx, Duration::from_millis(1100)).await;
    assert_eq!(backend.fetches() - before, 2);
    assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn intentional_stop_is_silent() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;

    ctrl.stop_live_session();
    assert!(ctrl.intentional_stop());
    settle(&mut ctrl, &mut rx, SHORT).await;

    assert!(!ctrl.intentional_stop(), "flag consumed by the failure handler");
    assert!(ctrl.view().notification.is_none());
    assert_eq!(ctrl.live_state(), LiveSessionState::Idle);
    assert_eq!(ctrl.view().live.counters, Counters::idle());
    assert_eq!(ctrl.view().live.status, view::STATUS_WAITING);
    assert_eq!(ctrl.view().live.sub_view, LiveSubView::Selection);
    assert_eq!(ctrl.view().live.pause_icon, PauseIcon::Play);
    assert!(!ctrl.is_polling());
    assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unexpected_stream_loss_reports_camera_error() {
    let (mut ctrl, mut rx, _b) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;

    ctrl.clear_stream_source();
    settle(&mut ctrl, &mut rx, SHORT).await;

    assert_eq!(ctrl.live_state(), LiveSessionState::Error);
    assert!(!ctrl.is_polling());
    assert_eq!(ctrl.view().live.status, view::STATUS_LOAD_ERROR);
    let n = ctrl.view().notification.clone().unwrap();
    assert_eq!(n.title, "Error de Cámara");
    assert_eq!(n.severity, Severity::Error);
}

#[tokio::test(start_paused = true)]
async fn refused_stream_reports_camera_error() {
    let (mut ctrl, mut rx, backend) = controller();
    backend.set_stream(StreamScript::Refuse);
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Deadlift);
    settle(&mut ctrl, &mut rx, SHORT).await;

    assert_eq!(ctrl.live_state(), LiveSessionState::Error);
    assert!(!ctrl.view().live.loader_visible);
    assert_eq!(
        ctrl.view().notification.as_ref().map(|n| n.title.as_str()),
        Some("Error de Cámara")
    );
}

#[tokio::test(start_paused = true)]
async fn replaced_stream_failure_is_ignored() {
    let (mut ctrl, mut rx, backend) = controller();
    backend.set_stream(StreamScript::Stall);
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;
    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;

    // The first stream's failure arrives after the flag was reset for the
    // second session; it belongs to an older generation.
    assert!(ctrl.view().notification.is_none());
    assert_eq!(ctrl.live_state(), LiveSessionState::Loading);
    assert_eq!(backend.streams_opened.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn leaving_live_section_cancels_polling() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;
    assert!(ctrl.is_polling());

    ctrl.navigate_to("home");
    let fetched = backend.fetches();
    settle(&mut ctrl, &mut rx, Duration::from_millis(600)).await;

    assert_eq!(backend.fetches(), fetched);
    assert!(!ctrl.is_polling());
    assert_eq!(ctrl.live_state(), LiveSessionState::Idle);
    assert!(ctrl.view().notification.is_none());
    assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn going_back_from_live_stops_the_session() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::ShoulderPress);
    settle(&mut ctrl, &mut rx, SHORT).await;

    ctrl.go_back();
    settle(&mut ctrl, &mut rx, Duration::from_millis(600)).await;
    assert_eq!(ctrl.view().visible, Some(Section::Home));
    assert_eq!(ctrl.live_state(), LiveSessionState::Idle);
    assert!(!ctrl.is_polling());
    assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_without_session_sends_nothing() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.stop_live_session();
    ctrl.stop_live_session();
    settle(&mut ctrl, &mut rx, SHORT).await;
    assert_eq!(backend.stops.load(Ordering::SeqCst), 0);
    assert_eq!(ctrl.live_state(), LiveSessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn toggle_without_session_warns() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.toggle_pause();
    settle(&mut ctrl, &mut rx, SHORT).await;

    let n = ctrl.view().notification.clone().unwrap();
    assert_eq!(n.title, "Acción No Permitida");
    assert_eq!(n.severity, Severity::Warning);
    assert_eq!(backend.toggles.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_follow_backend_confirmation() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;

    ctrl.toggle_pause();
    assert_eq!(ctrl.view().live.status, view::STATUS_PAUSING);
    assert_eq!(ctrl.view().live.pause_icon, PauseIcon::Play);
    // A second press while the first is in flight is dropped.
    ctrl.toggle_pause();
    settle(&mut ctrl, &mut rx, SHORT).await;
    assert_eq!(backend.toggles.load(Ordering::SeqCst), 1);
    assert_eq!(ctrl.live_state(), LiveSessionState::Paused);
    assert_eq!(ctrl.view().live.status, view::STATUS_PAUSED);
    assert!(!ctrl.is_polling());

    let fetched = backend.fetches();
    settle(&mut ctrl, &mut rx, Duration::from_millis(1000)).await;
    assert_eq!(backend.fetches(), fetched);

    backend.set_toggle(Ok("Reanudado"));
    ctrl.toggle_pause();
    assert_eq!(ctrl.view().live.status, view::STATUS_RESUMING);
    settle(&mut ctrl, &mut rx, SHORT).await;
    assert_eq!(ctrl.live_state(), LiveSessionState::Detecting);
    assert_eq!(ctrl.view().live.pause_icon, PauseIcon::Pause);
    assert!(ctrl.is_polling());
}

#[tokio::test(start_paused = true)]
async fn mismatched_toggle_status_reverts_icon() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;

    backend.set_toggle(Ok("No hay detección activa para pausar/reanudar"));
    ctrl.toggle_pause();
    settle(&mut ctrl, &mut rx, SHORT).await;

    assert_eq!(ctrl.live_state(), LiveSessionState::Detecting);
    assert_eq!(ctrl.view().live.pause_icon, PauseIcon::Pause);
    assert_eq!(ctrl.view().live.status, view::STATUS_STATE_ERROR);
    assert_eq!(
        ctrl.view().notification.as_ref().map(|n| n.severity),
        Some(Severity::Error)
    );
}

#[tokio::test(start_paused = true)]
async fn failed_toggle_reports_control_error() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;

    backend.set_toggle(Err("connection reset"));
    ctrl.toggle_pause();
    settle(&mut ctrl, &mut rx, SHORT).await;

    assert_eq!(ctrl.live_state(), LiveSessionState::Detecting);
    assert_eq!(ctrl.view().live.pause_icon, PauseIcon::Pause);
    assert_eq!(ctrl.view().live.status, view::STATUS_CONTROL_ERROR);
    let n = ctrl.view().notification.clone().unwrap();
    assert_eq!(n.title, "Error de Control");
    assert!(n.body.contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn fullscreen_only_while_video_is_shown() {
    let (mut ctrl, mut rx, _b) = controller();
    ctrl.navigate_to("live-detection");
    ctrl.toggle_fullscreen();
    assert!(!ctrl.view().live.fullscreen);

    ctrl.start_live_session(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;
    ctrl.toggle_fullscreen();
    assert!(ctrl.view().live.fullscreen);

    ctrl.stop_live_session();
    assert!(!ctrl.view().live.fullscreen);
}

fn pushups_analysis() -> AnalysisResponse {
    AnalysisResponse {
        status: Some("success".into()),
        metrics: serde_json::from_value(serde_json::json!({
            "accuracy": 0.91,
            "training_time_s": 3.2
        }))
        .unwrap(),
        classification_report_data: Some(ClassificationReportData {
            headers: vec!["Clase".into(), "Precision".into()],
            data: vec![serde_json::from_value(serde_json::json!({
                "Clase": "correcto", "Precision": 0.9
            }))
            .unwrap()],
        }),
        chart_data_reps: Some(RepsChartData {
            labels: vec!["Correctas".into(), "Incorrectas".into()],
            values: vec![12, 3],
            chart_title: Some("Repeticiones".into()),
        }),
        roc_data: Some(RocData {
            fpr: vec![0.0, 1.0],
            tpr: vec![0.0, 1.0],
            auc: 0.5,
            chart_title: Some("Curva ROC".into()),
        }),
        confusion_matrix_data: Some(ConfusionMatrixData {
            labels: vec!["Real correcto".into(), "Real incorrecto".into()],
            prediction_labels: vec!["Pred. correcto".into(), "Pred. incorrecto".into()],
            matrix: vec![vec![10, 2], vec![1, 5]],
            chart_title: Some("Matriz de Confusión".into()),
        }),
        pr_data: Some(PrData {
            recall: vec![0.0, 0.5, 1.0],
            precision: vec![1.0, 0.9, 0.6],
            chart_title: Some("Curva Precision-Recall".into()),
        }),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn successful_analysis_fills_panels() {
    let (mut ctrl, mut rx, backend) = controller();
    *backend.analysis.lock().unwrap() = Ok(pushups_analysis());
    ctrl.navigate_to("analysis");
    ctrl.start_analysis(ExerciseType::Pushups);

    let a = &ctrl.view().analysis;
    assert!(!a.menu_visible);
    assert!(a.results_visible);
    assert!(a.is_loading());
    assert!(a.charts.is_none());

    settle(&mut ctrl, &mut rx, SHORT).await;
    let a = &ctrl.view().analysis;
    assert!(!a.is_loading());
    assert_eq!(a.error, None);
    let metrics = a.metrics.as_ref().unwrap();
    assert_eq!(metrics[1].name, "Tiempo de entrenamiento (s)");
    assert_eq!(a.report.as_ref().unwrap().rows, vec![vec!["correcto", "0.90"]]);
    let charts = a.charts.as_ref().unwrap();
    assert!(charts.reps.rendered().is_some());
    assert!(charts.roc.rendered().is_some());
    assert!(charts.confusion.rendered().is_some());
    assert!(charts.pr.rendered().is_some());
}

#[tokio::test(start_paused = true)]
async fn analysis_http_errors_are_inline() {
    let (mut ctrl, mut rx, backend) = controller();
    *backend.analysis.lock().unwrap() = Err((500, Some("Modelo no encontrado".into())));
    ctrl.navigate_to("analysis");
    ctrl.start_analysis(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;
    assert_eq!(
        ctrl.view().analysis.error.as_deref(),
        Some("Error de conexión o del servidor: Modelo no encontrado")
    );

    *backend.analysis.lock().unwrap() = Err((502, None));
    ctrl.start_analysis(ExerciseType::Squats);
    settle(&mut ctrl, &mut rx, SHORT).await;
    assert_eq!(
        ctrl.view().analysis.error.as_deref(),
        Some("Error de conexión o del servidor: HTTP error! status: 502")
    );
}

#[tokio::test(start_paused = true)]
async fn analysis_result_after_leaving_is_discarded() {
    let (mut ctrl, mut rx, backend) = controller();
    *backend.analysis.lock().unwrap() = Ok(pushups_analysis());
    ctrl.navigate_to("analysis");
    ctrl.start_analysis(ExerciseType::Pushups);
    ctrl.navigate_to("home");
    ctrl.navigate_to("analysis");
    settle(&mut ctrl, &mut rx, SHORT).await;

    let a = &ctrl.view().analysis;
    assert!(a.menu_visible);
    assert!(!a.results_visible);
    assert!(a.metrics.is_none());
    assert_eq!(backend.analyses.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn feedback_validation_blocks_submission() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("feedback");
    let form = ctrl.feedback_form_mut();
    form.selected = 2;
    form.cycle_option(1);
    ctrl.submit_feedback();
    settle(&mut ctrl, &mut rx, SHORT).await;

    let msg = ctrl.view().feedback.message.clone().unwrap();
    assert_eq!(msg.text, "Por favor, detalla el problema técnico.");
    assert_eq!(msg.kind, feedback::MessageKind::Error);
    assert!(backend.submitted.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn feedback_success_resets_form() {
    let (mut ctrl, mut rx, backend) = controller();
    ctrl.navigate_to("feedback");
    let form = ctrl.feedback_form_mut();
    form.cycle_option(1);
    ctrl.submit_feedback();
    assert!(ctrl.view().feedback.submitting);
    settle(&mut ctrl, &mut rx, SHORT).await;

    let f = &ctrl.view().feedback;
    assert!(!f.submitting);
    assert_eq!(f.answers[0].choice, None);
    assert_eq!(
        f.message.as_ref().map(|m| m.text.as_str()),
        Some("Feedback recibido y PDF generado")
    );
    let sent = backend.submitted.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0][feedback::QUESTIONS[0].text], "Sí");

    drop(sent);
    settle(&mut ctrl, &mut rx, Duration::from_secs(5)).await;
    ctrl.tick();
    assert!(ctrl.view().feedback.message.is_none());
}

#[tokio::test(start_paused = true)]
async fn feedback_rejection_shows_backend_message() {
    let (mut ctrl, mut rx, backend) = controller();
    *backend.feedback.lock().unwrap() = Err((400, Some("Datos incompletos".into())));
    ctrl.submit_feedback();
    settle(&mut ctrl, &mut rx, SHORT).await;
    assert_eq!(
        ctrl.view().feedback.message.as_ref().map(|m| m.text.as_str()),
        Some("Datos incompletos")
    );

    *backend.feedback.lock().unwrap() = Err((500, None));
    ctrl.submit_feedback();
    settle(&mut ctrl, &mut rx, SHORT).await;
    assert_eq!(
        ctrl.view().feedback.message.as_ref().map(|m| m.text.as_str()),
        Some(feedback::SUBMIT_FAILED)
    );
}
