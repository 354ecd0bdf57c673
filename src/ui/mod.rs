pub mod client_wizard;
pub mod clients;
pub mod components;
pub mod credentials;
pub mod menu;
pub mod report_wizard;
pub mod reports;
pub mod settings;
pub mod statistics;

use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Index after `current` in a list of `len` items, wrapping around
pub fn next_index(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    })
}

/// Index before `current` in a list of `len` items, wrapping around
pub fn previous_index(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(0) | None => len - 1,
        Some(i) => i - 1,
    })
}

/// Helper function to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
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

/// Split the frame into the screen body and a one-line status bar
pub fn screen_layout(size: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)].as_ref())
        .split(size);
    (chunks[0], chunks[1])
}

pub fn render_status<B: Backend>(frame: &mut Frame<B>, area: Rect, status: Option<&str>) {
    let (text, color) = match status {
        Some(message) => (message, Color::Yellow),
        None => ("Ready", Color::DarkGray),
    };
    frame.render_widget(Paragraph::new(text).style(Style::default().fg(color)), area);
}

/// Key help shown at the bottom of every screen
pub fn render_help<B: Backend>(frame: &mut Frame<B>, area: Rect, text: &str) {
    let help = Paragraph::new(text.to_string())
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_wraps() {
        assert_eq!(next_index(Some(2), 3), Some(0));
        assert_eq!(next_index(Some(0), 3), Some(1));
        assert_eq!(next_index(None, 3), Some(0));
        assert_eq!(previous_index(Some(0), 3), Some(2));
        assert_eq!(previous_index(Some(2), 3), Some(1));
        assert_eq!(next_index(Some(0), 0), None);
        assert_eq!(previous_index(None, 0), None);
    }
}
