//! Karaoke lyrics view - the active line stays vertically centered

use crate::app::state::KaraokeState;
use crate::tui::theme::Theme;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render(frame: &mut Frame, state: &KaraokeState, theme: &Theme, area: Rect) {
    let title = state
        .song()
        .map(|s| format!(" {} {} ", theme.icons.music, s.record.track_name))
        .unwrap_or_default();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(theme.border_set())
        .border_style(Style::default().fg(theme.palette.border))
        .title(title)
        .title_style(Style::default().fg(theme.palette.accent));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(lyrics) = state.lyrics().filter(|l| !l.is_empty()) else {
        let msg = Paragraph::new(Line::from(Span::styled(
            "No synced lyrics available",
            Style::default().fg(theme.palette.status),
        )))
        .alignment(Alignment::Center);
        let mid = Rect {
            y: inner.y + inner.height / 2,
            height: inner.height.min(1),
            ..inner
        };
        frame.render_widget(msg, mid);
        return;
    };

    let height = inner.height as usize;
    let (start, end) = visible_window(lyrics.len(), state.active_line, height);
    // Leave blank rows above the first line so it can sit in the middle too
    let pad = match state.active_line {
        Some(active) => (height / 2).saturating_sub(active.saturating_sub(start)),
        None => height / 2,
    };

    let mut rows: Vec<Line> = Vec::with_capacity(height);
    rows.extend(std::iter::repeat_n(Line::default(), pad.min(height)));
    for (i, line) in lyrics.lines()[start..end].iter().enumerate() {
        if rows.len() >= height {
            break;
        }
        let index = start + i;
        rows.push(Line::from(Span::styled(
            line.text.clone(),
            line_style(theme, index, state.active_line),
        )));
    }

    frame.render_widget(Paragraph::new(rows).alignment(Alignment::Center), inner);
}

fn line_style(theme: &Theme, index: usize, active: Option<usize>) -> Style {
    let distance = match active {
        Some(a) => a.abs_diff(index),
        None => index + 1,
    };
    match distance {
        0 => Style::default()
            .fg(theme.palette.active)
            .add_modifier(Modifier::BOLD),
        1 => Style::default().fg(theme.palette.near),
        _ => Style::default().fg(theme.palette.far),
    }
}

/// Slice of line indices to draw so that `active` lands mid-view.
pub fn visible_window(len: usize, active: Option<usize>, height: usize) -> (usize, usize) {
    if len == 0 || height == 0 {
        return (0, 0);
    }
    let start = match active {
        Some(a) => a.min(len - 1).saturating_sub(height / 2),
        None => 0,
    };
    (start, (start + height).min(len))
}
