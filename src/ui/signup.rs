use anyhow::Result;
use crossterm::event::KeyCode;
use std::path::PathBuf;
use tui::{
    backend::Backend,
    style::{Color, Style},
    text::Span,
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use super::components::{edit_text, field_row, render_footer, render_title, screen_layout, Notice};
use super::read_key;
use crate::forms::{FormErrors, SignupForm};

#[derive(Debug, PartialEq)]
pub enum SignupAction {
    Cancel,
    Submit(SignupForm),
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum SignupField {
    FirstName,
    LastName,
    Email,
    Password,
    Phone,
    Photo,
}

const FIELDS: [(SignupField, &str, &str); 6] = [
    (SignupField::FirstName, "First name", "first_name"),
    (SignupField::LastName, "Last name", "last_name"),
    (SignupField::Email, "Email", "email"),
    (SignupField::Password, "Password", "password"),
    (SignupField::Phone, "Phone (optional)", "phone"),
    (SignupField::Photo, "Photo path (optional)", "photo"),
];

pub struct SignupState {
    pub form: SignupForm,
    photo_path: String,
    pub current_field: SignupField,
    pub editing: bool,
    errors: FormErrors,
    pub notice: Option<Notice>,
}

impl SignupState {
    pub fn new() -> Self {
        Self {
            form: SignupForm::default(),
            photo_path: String::new(),
            current_field: SignupField::FirstName,
            editing: false,
            errors: FormErrors::default(),
            notice: None,
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    fn index(&self) -> usize {
        FIELDS
            .iter()
            .position(|(f, _, _)| *f == self.current_field)
            .unwrap_or(0)
    }

    pub fn next_field(&mut self) {
        self.current_field = FIELDS[(self.index() + 1) % FIELDS.len()].0;
    }

    pub fn previous_field(&mut self) {
        self.current_field = FIELDS[(self.index() + FIELDS.len() - 1) % FIELDS.len()].0;
    }

    fn value_mut(&mut self, field: SignupField) -> &mut String {
        match field {
            SignupField::FirstName => &mut self.form.first_name,
            SignupField::LastName => &mut self.form.last_name,
            SignupField::Email => &mut self.form.email,
            SignupField::Password => &mut self.form.password,
            SignupField::Phone => &mut self.form.phone,
            SignupField::Photo => &mut self.photo_path,
        }
    }

    fn value(&self, field: SignupField) -> &str {
        match field {
            SignupField::FirstName => &self.form.first_name,
            SignupField::LastName => &self.form.last_name,
            SignupField::Email => &self.form.email,
            SignupField::Password => &self.form.password,
            SignupField::Phone => &self.form.phone,
            SignupField::Photo => &self.photo_path,
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }
        let field = self.current_field;
        edit_text(self.value_mut(field), key);
    }

    /// Validate every field at once; the form carries the photo on success
    pub fn submit(&mut self) -> Option<SignupForm> {
        let photo = self.photo_path.trim();
        self.form.photo = if photo.is_empty() {
            None
        } else {
            Some(PathBuf::from(photo))
        };

        match self.form.validate() {
            Ok(_) => {
                self.errors = FormErrors::default();
                Some(self.form.clone())
            }
            Err(errors) => {
                self.errors = errors;
                self.notice = Some(Notice::error(SignupForm::INCOMPLETE));
                None
            }
        }
    }
}

impl Default for SignupState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_signup<B: Backend>(f: &mut Frame<B>, state: &mut SignupState) {
    let chunks = screen_layout(f.size());
    render_title(f, chunks[0], "Create an account");

    let items: Vec<ListItem> = FIELDS
        .iter()
        .map(|(field, name, key)| {
            let selected = *field == state.current_field;
            let masked = *field == SignupField::Password;
            let mut row = field_row(name, state.value(*field), selected, selected && state.editing, masked);
            if let Some(message) = state.errors.for_field(key) {
                row.0.push(Span::styled(format!("  {}", message), Style::default().fg(Color::Red)));
            }
            ListItem::new(row)
        })
        .collect();
    let form = List::new(items).block(Block::default().borders(Borders::ALL).title("Your details"));
    f.render_widget(form, chunks[1]);

    let help = if state.editing {
        "<Enter> Save field | <Esc> Cancel editing"
    } else {
        "<Enter> Edit field | <Up/Down> Navigate | <S> Sign up | <Esc> Back"
    };
    render_footer(f, chunks[2], help, state.notice.as_ref());
}

pub fn handle_key(state: &mut SignupState, key: KeyCode) -> Option<SignupAction> {
    match key {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(SignupAction::Cancel);
            }
        }
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down if !state.editing => state.next_field(),
        KeyCode::Char('s') if !state.editing => {
            return state.submit().map(SignupAction::Submit);
        }
        _ if state.editing => state.edit_current_field(key),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut SignupState) -> Result<Option<SignupAction>> {
    Ok(read_key()?.and_then(|key| handle_key(state, key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(state: &mut SignupState, values: &[&str]) {
        for value in values {
            handle_key(state, KeyCode::Enter);
            for c in value.chars() {
                handle_key(state, KeyCode::Char(c));
            }
            handle_key(state, KeyCode::Enter);
            handle_key(state, KeyCode::Down);
        }
    }

    #[test]
    fn test_every_missing_field_is_flagged() {
        let mut state = SignupState::new();
        fill(&mut state, &["Ana"]);
        assert_eq!(handle_key(&mut state, KeyCode::Char('s')), None);
        assert_eq!(state.errors.for_field("first_name"), None);
        assert_eq!(state.errors.for_field("email"), Some("Email is required."));
        assert_eq!(state.notice, Some(Notice::error("Please fill in all required fields.")));
    }

    #[test]
    fn test_complete_form_submits_with_photo() {
        let mut state = SignupState::new();
        fill(
            &mut state,
            &["Ana", "Rivera", "ana@example.com", "password1", "", "/tmp/me.png"],
        );
        let Some(SignupAction::Submit(form)) = handle_key(&mut state, KeyCode::Char('s')) else {
            panic!("expected submit");
        };
        assert_eq!(form.last_name, "Rivera");
        assert_eq!(form.photo, Some(PathBuf::from("/tmp/me.png")));
        assert!(state.errors.is_empty());
    }
}
