use mp3_player::{EngineState, TrackDecoder};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph},
};

use super::app::App;

pub(crate) fn draw<D: TrackDecoder>(f: &mut ratatui::Frame, app: &mut App<D>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(f.area());

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[0]);

    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(7)])
        .split(main_chunks[1]);

    draw_track_list(f, app, main_chunks[0]);
    draw_now_playing(f, app, side_chunks[0]);
    draw_controls(f, app, side_chunks[1]);

    let footer = Paragraph::new(Line::from(format!("status: {}", app.status)))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(footer, chunks[1]);

    if app.logs_open {
        draw_logs(f, app);
    }
}

fn draw_track_list<D: TrackDecoder>(f: &mut ratatui::Frame, app: &mut App<D>, area: Rect) {
    let library = app.controller.library();
    let title = format!("Tracks ({})", library.dir().display());
    let block = Block::default().borders(Borders::ALL).title(title);

    if library.is_empty() {
        let empty = Paragraph::new("No music files found")
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let playing = match app.snapshot.state {
        EngineState::Playing | EngineState::Paused => app.snapshot.current_index,
        _ => None,
    };
    let items: Vec<ListItem> = library
        .names()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if playing == Some(idx) {
                ListItem::new(format!("{name}  [playing]"))
            } else {
                ListItem::new(name.as_str())
            }
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");
    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_now_playing<D: TrackDecoder>(f: &mut ratatui::Frame, app: &App<D>, area: Rect) {
    let s = &app.snapshot;
    let block = Block::default().borders(Borders::ALL).title("Now Playing");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(1)])
        .split(inner);

    let format_line = match (s.codec.as_deref(), s.sample_rate, s.channels) {
        (codec, Some(rate), Some(ch)) => {
            format!("format: {} {rate} Hz, {ch} ch", codec.unwrap_or("-"))
        }
        _ => "format: -".to_string(),
    };
    let info = Paragraph::new(vec![
        Line::from(format!("track: {}", s.now_playing.as_deref().unwrap_or("-"))),
        Line::from(format_line),
        Line::from(format!("state: {}", s.state_label())),
    ]);
    f.render_widget(info, rows[0]);

    let elapsed = s.elapsed_ms().unwrap_or(0);
    match s.duration_ms {
        Some(total_ms) if total_ms > 0 => {
            let ratio = (elapsed as f64 / total_ms as f64).clamp(0.0, 1.0);
            let gauge = Gauge::default()
                .ratio(ratio)
                .label(format!(
                    "{} / {}",
                    format_duration_ms(elapsed),
                    format_duration_ms(total_ms)
                ))
                .gauge_style(Style::default().fg(Color::White).bg(Color::Black));
            f.render_widget(gauge, rows[1]);
        }
        _ => f.render_widget(Paragraph::new("progress: -"), rows[1]),
    }
}

fn draw_controls<D: TrackDecoder>(f: &mut ratatui::Frame, app: &App<D>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Controls");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let volume = Gauge::default()
        .ratio(f64::from(app.volume) / 100.0)
        .label(format!("Volume {}%", app.volume))
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black));
    f.render_widget(volume, rows[0]);

    let help = Paragraph::new(vec![
        Line::from("↑/↓ select | Enter change track | p play | Space pause"),
        Line::from("b/← prev | n/→ next | +/- volume | s stop"),
        Line::from("l logs | q quit"),
    ]);
    f.render_widget(help, rows[1]);
}

fn draw_logs<D: TrackDecoder>(f: &mut ratatui::Frame, app: &App<D>) {
    let area = centered_rect(90, 80, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Logs (Esc to close, ↑/↓ scroll)");
    let inner = block.inner(area);
    let height = inner.height as usize;
    let total = app.logs.len();
    let end = total.saturating_sub(app.logs_scroll);
    let start = end.saturating_sub(height);
    let mut items: Vec<ListItem> = app
        .logs
        .iter()
        .skip(start)
        .take(end - start)
        .map(|line| ListItem::new(line.as_str()))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("<no logs>"));
    }
    f.render_widget(List::new(items).block(block), area);
}

fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
