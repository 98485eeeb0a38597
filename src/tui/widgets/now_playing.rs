//! Now Playing bar - title, progress and volume under the lyrics

use crate::app::state::{KaraokeState, ToastKind};
use crate::tui::theme::{Icons, Theme};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(frame: &mut Frame, state: &KaraokeState, theme: &Theme, area: Rect) {
    let icons = &theme.icons;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(theme.palette.border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let padded = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(1)])
        .split(inner)[1];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title - artist
            Constraint::Length(1), // Progress bar
            Constraint::Length(1), // Time + state + volume
            Constraint::Min(0),    // Toast
        ])
        .split(padded);

    let content_width = padded.width as usize;

    let heading = match state.song() {
        Some(song) => format!("{} - {}", song.record.track_name, song.record.artist_name),
        None => "Nothing to play".to_string(),
    };
    let position = if state.songs.len() > 1 {
        format!("  [{}/{}]", state.current + 1, state.songs.len())
    } else {
        String::new()
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                truncate_str(&heading, content_width.saturating_sub(position.chars().count())),
                Style::default()
                    .fg(theme.palette.active)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(position, Style::default().fg(theme.palette.status)),
        ])),
        rows[0],
    );

    let ratio = if state.duration_secs > 0.0 {
        (state.position_secs / state.duration_secs).clamp(0.0, 1.0)
    } else {
        0.0
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            render_progress_bar(rows[1].width as usize, ratio, icons),
            Style::default().fg(theme.palette.accent),
        ))),
        rows[1],
    );

    let state_icon = if state.paused { icons.pause } else { icons.play };
    let controls = Line::from(vec![
        Span::styled(state_icon, Style::default().fg(theme.palette.accent)),
        Span::raw(" "),
        Span::styled(
            format!("{}/{}", clock(state.position_secs), clock(state.duration_secs)),
            Style::default().fg(theme.palette.status),
        ),
        Span::raw("  "),
        Span::styled(
            format!("vol {}%", state.volume),
            Style::default().fg(theme.palette.status),
        ),
        Span::raw("  "),
        Span::styled(
            "space pause  ←/→ seek  n/p song  q quit",
            Style::default().fg(theme.palette.far),
        ),
    ]);
    frame.render_widget(Paragraph::new(controls), rows[2]);

    if let Some(toast) = &state.toast
        && !toast.is_expired()
    {
        let (prefix, color) = match toast.kind {
            ToastKind::Success => (icons.success, theme.palette.accent),
            ToastKind::Error => (icons.error, theme.palette.error),
        };
        let toast_line = Line::from(vec![
            Span::styled(format!("{} ", prefix), Style::default().fg(color)),
            Span::styled(
                truncate_str(&toast.message, content_width.saturating_sub(2)),
                Style::default().fg(color),
            ),
        ]);
        frame.render_widget(Paragraph::new(toast_line), rows[3]);
    }
}

/// `mm:ss`, whole seconds
fn clock(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 { secs.floor() as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn render_progress_bar(width: usize, ratio: f64, icons: &Icons) -> String {
    if width < 3 {
        return String::new();
    }

    let filled = ((width - 1) as f64 * ratio).round() as usize;
    let empty = width.saturating_sub(filled + 1);

    let mut bar = String::with_capacity(width * 3);
    for _ in 0..filled {
        bar.push_str(icons.progress_full);
    }
    bar.push_str(icons.progress_head);
    for _ in 0..empty {
        bar.push_str(icons.progress_empty);
    }
    bar
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }

    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_format() {
        assert_eq!(clock(0.0), "00:00");
        assert_eq!(clock(83.9), "01:23");
        assert_eq!(clock(-3.0), "00:00");
        assert_eq!(clock(f64::NAN), "00:00");
    }

    #[test]
    fn test_progress_bar_width() {
        let icons = Icons::unicode();
        let bar = render_progress_bar(10, 0.5, &icons);
        assert_eq!(bar.chars().count(), 10);
        assert!(render_progress_bar(2, 0.5, &icons).is_empty());
        assert!(render_progress_bar(5, 1.0, &icons).ends_with(icons.progress_head));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 8), "hi");
        assert_eq!(truncate_str("hello", 2), "he");
    }
}
