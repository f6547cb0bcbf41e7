//! Widgets and helpers shared by the screens.

mod choice;

pub use choice::ChoiceCursor;

use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// One-line feedback shown under a screen
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice::Info(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice::Error(message.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) | Notice::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

/// Apply a typed character or backspace to a text field
pub fn edit_text(value: &mut String, key: KeyCode) {
    match key {
        KeyCode::Char(c) => value.push(c),
        KeyCode::Backspace => {
            value.pop();
        }
        _ => {}
    }
}

/// `Label: value` row for wizard forms, with a cursor while editing
pub fn field_row(name: &str, value: &str, selected: bool, editing: bool, masked: bool) -> Spans<'static> {
    let shown = if masked {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };

    if selected && editing {
        Spans::from(vec![
            Span::styled(format!("{}: ", name), Style::default().fg(Color::Yellow)),
            Span::styled(format!("{}|", shown), Style::default().add_modifier(Modifier::BOLD)),
        ])
    } else {
        let style = if selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Spans::from(vec![Span::styled(format!("{}: ", name), style), Span::raw(shown)])
    }
}

pub fn render_title<B: Backend>(f: &mut Frame<B>, area: Rect, title: &str) {
    let title = Paragraph::new(title.to_string())
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

/// Key hints plus the current notice, if any
pub fn render_footer<B: Backend>(f: &mut Frame<B>, area: Rect, help: &str, notice: Option<&Notice>) {
    let mut lines = Vec::new();
    if let Some(notice) = notice {
        let color = if notice.is_error() { Color::Red } else { Color::Green };
        lines.push(Spans::from(Span::styled(
            notice.text().to_string(),
            Style::default().fg(color),
        )));
    }
    lines.push(Spans::from(Span::styled(
        help.to_string(),
        Style::default().fg(Color::Gray),
    )));

    let footer = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

pub fn render_confirmation<B: Backend>(f: &mut Frame<B>, title: &str, lines: &[&str]) {
    let area = centered_rect(50, 25, f.size());
    let mut text = vec![Spans::from("")];
    for line in lines {
        text.push(Spans::from(line.to_string()));
        text.push(Spans::from(""));
    }
    text.push(Spans::from("<Y> Yes  <N> No"));

    let popup = Paragraph::new(text)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .style(Style::default().fg(Color::White).bg(Color::Black));
    f.render_widget(popup, area);
}

/// Standard title / body / footer split
pub fn screen_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(4),
        ])
        .split(area)
}

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_text() {
        let mut value = String::from("ab");
        edit_text(&mut value, KeyCode::Char('c'));
        edit_text(&mut value, KeyCode::Backspace);
        edit_text(&mut value, KeyCode::Backspace);
        edit_text(&mut value, KeyCode::Left);
        assert_eq!(value, "a");
    }

    #[test]
    fn test_masked_row_hides_value() {
        let row = field_row("Password", "secret", false, false, true);
        assert_eq!(row.0[1].content, "******");
    }

    #[test]
    fn test_centered_rect_is_inside() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered_rect(50, 50, outer);
        assert_eq!(inner.width, 50);
        assert_eq!(inner.height, 20);
        assert_eq!(inner.x, 25);
    }
}
