use anyhow::Result;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use super::components::{render_confirmation, render_footer, render_title, screen_layout, ChoiceCursor, Notice};
use super::read_key;
use crate::models::{Provider, ProviderStatus};

pub const DELETE_FAILED: &str = "Could not delete right now. Try again.";

// The signed-in user's own listings
pub struct MyServicesState {
    providers: Vec<Provider>,
    cursor: ChoiceCursor,
    show_delete_confirmation: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug, PartialEq)]
pub enum MyServicesAction {
    Back,
    NewService,
    EditService(i64),
    DeleteService(i64),
    ViewService(i64),
}

impl MyServicesState {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self {
            cursor: ChoiceCursor::new(providers.len()),
            providers,
            show_delete_confirmation: false,
            notice: None,
        }
    }

    pub fn next(&mut self) {
        self.cursor.next(self.providers.len());
    }

    pub fn previous(&mut self) {
        self.cursor.previous(self.providers.len());
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn selected_service(&self) -> Option<&Provider> {
        self.cursor.selected().and_then(|i| self.providers.get(i))
    }

    pub fn selected_service_id(&self) -> Option<i64> {
        self.selected_service().map(|p| p.id)
    }

    pub fn remove(&mut self, id: i64) {
        self.providers.retain(|p| p.id != id);
        self.cursor.clamp(self.providers.len());
        self.notice = Some(Notice::info("Service deleted."));
    }
}

fn status_color(status: ProviderStatus) -> Color {
    match status {
        ProviderStatus::Approved => Color::Green,
        ProviderStatus::Pending => Color::Yellow,
        ProviderStatus::Inactive | ProviderStatus::Unknown => Color::DarkGray,
    }
}

pub fn render_my_services<B: Backend>(frame: &mut Frame<B>, state: &mut MyServicesState) {
    let chunks = screen_layout(frame.size());
    render_title(frame, chunks[0], "My services");

    let items: Vec<ListItem> = state
        .providers
        .iter()
        .map(|provider| {
            ListItem::new(Spans::from(vec![
                Span::raw(format!("{}  ", provider.title())),
                Span::styled(
                    format!("[{}]", provider.status.label()),
                    Style::default().fg(status_color(provider.status)),
                ),
            ]))
        })
        .collect();

    let services = List::new(items)
        .block(Block::default().title("Your listings").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(services, chunks[1], state.cursor.state_mut());

    let help = if state.selected_service().is_some() {
        "<N> New service | <E> Edit | <D> Delete | <Enter> View | <Esc> Back"
    } else {
        "<N> New service | <Esc> Back"
    };
    render_footer(frame, chunks[2], help, state.notice.as_ref());

    if state.show_delete_confirmation {
        render_confirmation(
            frame,
            "Confirm Delete",
            &["Are you sure you want to delete this service?", "Its reviews and bookmarks go with it."],
        );
    }
}

pub fn handle_key(state: &mut MyServicesState, key: KeyCode) -> Option<MyServicesAction> {
    if state.show_delete_confirmation {
        match key {
            KeyCode::Char('y') => {
                state.toggle_delete_confirmation();
                return state.selected_service_id().map(MyServicesAction::DeleteService);
            }
            KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => state.toggle_delete_confirmation(),
            _ => {}
        }
        return None;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => return Some(MyServicesAction::Back),
        KeyCode::Char('n') => return Some(MyServicesAction::NewService),
        KeyCode::Char('e') => return state.selected_service_id().map(MyServicesAction::EditService),
        KeyCode::Char('d') => {
            if state.selected_service().is_some() {
                state.toggle_delete_confirmation();
            }
        }
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        KeyCode::Enter => return state.selected_service_id().map(MyServicesAction::ViewService),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut MyServicesState) -> Result<Option<MyServicesAction>> {
    Ok(read_key()?.and_then(|key| handle_key(state, key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> MyServicesState {
        MyServicesState::new(vec![
            Provider { id: 1, name: "A".into(), ..Default::default() },
            Provider { id: 2, name: "B".into(), status: ProviderStatus::Approved, ..Default::default() },
        ])
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let mut state = state();
        handle_key(&mut state, KeyCode::Down);
        assert_eq!(handle_key(&mut state, KeyCode::Char('d')), None);
        // Other keys are swallowed by the popup
        assert_eq!(handle_key(&mut state, KeyCode::Char('e')), None);
        assert_eq!(handle_key(&mut state, KeyCode::Char('y')), Some(MyServicesAction::DeleteService(2)));

        state.remove(2);
        assert_eq!(state.selected_service_id(), Some(1));
    }

    #[test]
    fn test_declining_keeps_listing() {
        let mut state = state();
        handle_key(&mut state, KeyCode::Char('d'));
        handle_key(&mut state, KeyCode::Char('n'));
        assert_eq!(handle_key(&mut state, KeyCode::Esc), Some(MyServicesAction::Back));
    }

    #[test]
    fn test_empty_list_only_offers_new() {
        let mut state = MyServicesState::new(Vec::new());
        assert_eq!(handle_key(&mut state, KeyCode::Char('e')), None);
        assert_eq!(handle_key(&mut state, KeyCode::Enter), None);
        assert_eq!(handle_key(&mut state, KeyCode::Char('n')), Some(MyServicesAction::NewService));
    }
}
