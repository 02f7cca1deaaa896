use crate::controller::analysis::{BarChart as RepsChart, ChartSet, ChartSlot, ConfusionGrid, CurveChart};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph, Wrap},
    Frame,
};

const WAITING: &str = "Esperando datos...";

/// Bordered box with a centered message, used for empty and unavailable slots.
fn render_placeholder(f: &mut Frame, area: Rect, title: &str, message: &str, color: Color) {
    let p = Paragraph::new(message)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(p, area);
}

/// Render the four analysis charts in a 2x2 grid.
pub fn draw_chart_grid(f: &mut Frame, area: Rect, charts: &ChartSet) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[1]);

    draw_reps(f, top[0], &charts.reps);
    draw_confusion(f, top[1], &charts.confusion);
    draw_curve(f, bottom[0], &charts.roc, "Curva ROC", Color::Cyan);
    draw_curve(f, bottom[1], &charts.pr, "Curva Precision-Recall", Color::Magenta);
}

fn draw_reps(f: &mut Frame, area: Rect, slot: &ChartSlot<RepsChart>) {
    let chart = match slot {
        ChartSlot::Rendered(c) => c,
        ChartSlot::Unavailable(msg) => {
            return render_placeholder(f, area, "Repeticiones", msg, Color::Yellow)
        }
        ChartSlot::Empty => return render_placeholder(f, area, "Repeticiones", WAITING, Color::Gray),
    };

    let bar_colors = [Color::Green, Color::Red, Color::Cyan, Color::Yellow];
    let bars: Vec<Bar> = chart
        .bars
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            Bar::default()
                .value(*value)
                .label(Line::from(label.clone()))
                .style(Style::default().fg(bar_colors[i % bar_colors.len()]))
                .value_style(Style::default().fg(Color::Black).bg(bar_colors[i % bar_colors.len()]))
        })
        .collect();

    let inner_width = area.width.saturating_sub(2) as usize;
    let num_bars = bars.len().max(1);
    let bar_width = ((inner_width / num_bars).saturating_sub(2)).clamp(1, 12) as u16;
    let max = chart.bars.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1);

    let widget = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(chart.title.clone()))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(2)
        .max(max);
    f.render_widget(widget, area);
}

/// Green shades on the diagonal, red off it, brighter for larger counts.
fn cell_color(intensity: f64, diagonal: bool) -> Color {
    let level = (60.0 + 195.0 * intensity.clamp(0.0, 1.0)) as u8;
    if diagonal {
        Color::Rgb(0, level, 0)
    } else {
        Color::Rgb(level, 0, 0)
    }
}

fn draw_confusion(f: &mut Frame, area: Rect, slot: &ChartSlot<ConfusionGrid>) {
    let grid = match slot {
        ChartSlot::Rendered(g) => g,
        ChartSlot::Unavailable(msg) => {
            return render_placeholder(f, area, "Matriz de Confusión", msg, Color::Yellow)
        }
        ChartSlot::Empty => {
            return render_placeholder(f, area, "Matriz de Confusión", WAITING, Color::Gray)
        }
    };

    let label_width = grid.row_labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let cell_width = grid
        .column_labels
        .iter()
        .map(|l| l.chars().count())
        .chain(grid.cells.iter().flatten().map(|c| c.value.to_string().len()))
        .max()
        .unwrap_or(1)
        + 2;

    let mut lines = Vec::with_capacity(grid.cells.len() + 2);
    let mut header = vec![Span::raw(format!("{:<label_width$} ", ""))];
    for col in &grid.column_labels {
        header.push(Span::styled(
            format!("{col:^cell_width$}"),
            Style::default().fg(Color::Gray),
        ));
    }
    lines.push(Line::from(header));

    for (label, row) in grid.row_labels.iter().zip(&grid.cells) {
        let mut spans = vec![Span::styled(
            format!("{label:<label_width$} "),
            Style::default().fg(Color::Gray),
        )];
        for cell in row {
            spans.push(Span::styled(
                format!("{:^cell_width$}", cell.value),
                Style::default()
                    .fg(Color::White)
                    .bg(cell_color(cell.intensity, cell.diagonal))
                    .add_modifier(Modifier::BOLD),
            ));
        }
        lines.push(Line::from(spans));
    }

    let title = if grid.title.is_empty() {
        "Matriz de Confusión".to_string()
    } else {
        grid.title.clone()
    };
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_curve(f: &mut Frame, area: Rect, slot: &ChartSlot<CurveChart>, fallback: &str, color: Color) {
    let curve = match slot {
        ChartSlot::Rendered(c) => c,
        ChartSlot::Unavailable(msg) => return render_placeholder(f, area, fallback, msg, Color::Yellow),
        ChartSlot::Empty => return render_placeholder(f, area, fallback, WAITING, Color::Gray),
    };

    let mut datasets = Vec::with_capacity(2);
    if let Some(reference) = curve.reference.as_ref() {
        datasets.push(
            Dataset::default()
                .graph_type(GraphType::Line)
                .marker(symbols::Marker::Dot)
                .style(Style::default().fg(Color::DarkGray))
                .data(reference),
        );
    }
    datasets.push(
        Dataset::default()
            .graph_type(GraphType::Line)
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(color))
            .data(&curve.points),
    );

    let unit_labels = || vec![Span::raw("0"), Span::raw("0.5"), Span::raw("1")];
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from(Span::styled(curve.title.clone(), Style::default().fg(color)))),
        )
        .x_axis(
            Axis::default()
                .title(curve.x_label.clone())
                .bounds([0.0, 1.0])
                .labels(unit_labels()),
        )
        .y_axis(
            Axis::default()
                .title(curve.y_label.clone())
                .bounds([0.0, 1.0])
                .labels(unit_labels()),
        );
    f.render_widget(chart, area);
}
