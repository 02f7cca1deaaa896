use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn key_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{key:<12}"), Style::default().fg(Color::Magenta)),
        Span::raw(desc),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Cómo usar la aplicación:"),
        Line::from("  Elige un ejercicio en Detección en Vivo para contar repeticiones con la cámara,"),
        Line::from("  o ejecuta un Análisis para ver las métricas del modelo entrenado."),
        Line::from(""),
        Line::from("General:"),
        key_line("F1-F5", "Inicio, Detección en Vivo, Análisis, Ayuda, Encuesta"),
        key_line("m", "Abrir/cerrar el menú (↑/↓ y Enter para elegir)"),
        key_line("Backspace", "Volver a la sección anterior"),
        key_line("Esc", "Cerrar la notificación"),
        key_line("q / Ctrl-C", "Salir (detiene la sesión en vivo)"),
        Line::from(""),
        Line::from("Detección en Vivo:"),
        key_line("1-4", "Iniciar sentadillas, flexiones, peso muerto o press de hombro"),
        key_line("p", "Pausar/Reanudar la detección"),
        key_line("x", "Detener la sesión"),
        key_line("f", "Pantalla completa"),
        Line::from(""),
        Line::from("Análisis:"),
        key_line("1-4", "Analizar un ejercicio"),
        key_line("e", "Exportar gráficos (JSON)"),
        key_line("c", "Exportar el reporte de clasificación (CSV)"),
        key_line("y", "Copiar la ruta exportada al portapapeles"),
        Line::from(""),
        Line::from("Encuesta:"),
        key_line("↑/↓", "Cambiar de pregunta"),
        key_line("←/→", "Elegir respuesta"),
        key_line("Enter", "Escribir texto / terminar de escribir"),
        key_line("s", "Enviar la encuesta"),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Ayuda"));
    f.render_widget(p, area);
}
