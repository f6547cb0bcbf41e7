use anyhow::Result;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use super::components::{render_footer, render_title, screen_layout, ChoiceCursor, Notice};
use super::read_key;
use crate::models::Provider;

pub const LOAD_FAILED: &str = "Could not load bookmarks right now.";

pub struct BookmarksState {
    providers: Vec<Provider>,
    cursor: ChoiceCursor,
    pub notice: Option<Notice>,
}

#[derive(Debug, PartialEq)]
pub enum BookmarksAction {
    Back,
    Open(i64),
    Remove(i64),
}

impl BookmarksState {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self {
            cursor: ChoiceCursor::new(providers.len()),
            providers,
            notice: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let mut state = Self::new(Vec::new());
        state.notice = Some(Notice::error(message));
        state
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.cursor
            .selected()
            .and_then(|i| self.providers.get(i))
            .map(|p| p.id)
    }

    pub fn removed(&mut self, id: i64) {
        self.providers.retain(|p| p.id != id);
        self.cursor.clamp(self.providers.len());
        self.notice = Some(Notice::info("Removed from bookmarks."));
    }
}

pub fn render_bookmarks<B: Backend>(f: &mut Frame<B>, state: &mut BookmarksState) {
    let chunks = screen_layout(f.size());
    render_title(f, chunks[0], "Bookmarks");

    let items: Vec<ListItem> = if state.providers.is_empty() {
        vec![ListItem::new("You have not bookmarked anyone yet.")]
    } else {
        state
            .providers
            .iter()
            .map(|p| ListItem::new(format!("{}  {}  {}", p.title(), p.display_area(), p.display_price())))
            .collect()
    };

    let list = List::new(items)
        .block(Block::default().title("Saved providers").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, chunks[1], state.cursor.state_mut());

    render_footer(
        f,
        chunks[2],
        "<Enter> View | <D> Remove bookmark | <Esc> Back",
        state.notice.as_ref(),
    );
}

pub fn handle_key(state: &mut BookmarksState, key: KeyCode) -> Option<BookmarksAction> {
    match key {
        KeyCode::Esc | KeyCode::Char('q') => Some(BookmarksAction::Back),
        KeyCode::Down => {
            state.cursor.next(state.providers.len());
            None
        }
        KeyCode::Up => {
            state.cursor.previous(state.providers.len());
            None
        }
        KeyCode::Enter => state.selected_id().map(BookmarksAction::Open),
        KeyCode::Char('d') => state.selected_id().map(BookmarksAction::Remove),
        _ => None,
    }
}

pub fn handle_input(state: &mut BookmarksState) -> Result<Option<BookmarksAction>> {
    Ok(read_key()?.and_then(|key| handle_key(state, key)))
}
