use anyhow::Result;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use super::components::{edit_text, field_row, render_footer, render_title, screen_layout, Notice};
use super::read_key;
use crate::forms::LoginForm;

#[derive(Debug, PartialEq)]
pub enum LoginAction {
    Cancel,
    Submit(LoginForm),
    MagicLink(String),
    Signup,
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum LoginField {
    Email,
    Password,
    MagicToken,
}

pub struct LoginState {
    pub form: LoginForm,
    pub magic_token: String,
    pub current_field: LoginField,
    pub editing: bool,
    pub notice: Option<Notice>,
}

impl LoginState {
    pub fn new() -> Self {
        Self {
            form: LoginForm::default(),
            magic_token: String::new(),
            current_field: LoginField::Email,
            editing: false,
            notice: None,
        }
    }

    /// Login screen opened by a guard, explaining why
    pub fn with_notice(message: impl Into<String>) -> Self {
        Self {
            notice: Some(Notice::info(message)),
            ..Self::new()
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::MagicToken,
            LoginField::MagicToken => LoginField::Email,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            LoginField::Email => LoginField::MagicToken,
            LoginField::Password => LoginField::Email,
            LoginField::MagicToken => LoginField::Password,
        };
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }
        let field_value = match self.current_field {
            LoginField::Email => &mut self.form.email,
            LoginField::Password => &mut self.form.password,
            LoginField::MagicToken => &mut self.magic_token,
        };
        edit_text(field_value, key);
    }

    /// Failed attempts keep the email but clear the password
    pub fn failed(&mut self, message: String) {
        self.form.password.clear();
        self.notice = Some(Notice::error(message));
    }
}

impl Default for LoginState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_login<B: Backend>(f: &mut Frame<B>, state: &mut LoginState) {
    let chunks = screen_layout(f.size());
    render_title(f, chunks[0], "Log in");

    let rows = [
        (LoginField::Email, "Email", state.form.email.as_str(), false),
        (LoginField::Password, "Password", state.form.password.as_str(), true),
        (LoginField::MagicToken, "Magic link token", state.magic_token.as_str(), false),
    ];
    let items: Vec<ListItem> = rows
        .iter()
        .map(|(field, name, value, masked)| {
            let selected = *field == state.current_field;
            ListItem::new(field_row(name, value, selected, selected && state.editing, *masked))
        })
        .collect();
    let form = List::new(items).block(Block::default().borders(Borders::ALL).title("Account"));
    f.render_widget(form, chunks[1]);

    let help = if state.editing {
        "<Enter> Save field | <Esc> Cancel editing"
    } else {
        "<Enter> Edit field | <Up/Down> Navigate | <S> Log in | <M> Use magic link | <N> Create account | <Esc> Back"
    };
    render_footer(f, chunks[2], help, state.notice.as_ref());
}

pub fn handle_key(state: &mut LoginState, key: KeyCode) -> Option<LoginAction> {
    match key {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(LoginAction::Cancel);
            }
        }
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down if !state.editing => state.next_field(),
        KeyCode::Char('s') if !state.editing => match state.form.validate() {
            Ok(_) => return Some(LoginAction::Submit(state.form.clone())),
            Err(err) => state.notice = Some(Notice::error(err.message)),
        },
        KeyCode::Char('m') if !state.editing => {
            return Some(LoginAction::MagicLink(state.magic_token.clone()));
        }
        KeyCode::Char('n') if !state.editing => return Some(LoginAction::Signup),
        _ if state.editing => state.edit_current_field(key),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut LoginState) -> Result<Option<LoginAction>> {
    Ok(read_key()?.and_then(|key| handle_key(state, key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_into(state: &mut LoginState, text: &str) {
        handle_key(state, KeyCode::Enter);
        for c in text.chars() {
            handle_key(state, KeyCode::Char(c));
        }
        handle_key(state, KeyCode::Enter);
    }

    #[test]
    fn test_missing_password_blocks_submit() {
        let mut state = LoginState::new();
        type_into(&mut state, "ana@example.com");
        assert_eq!(handle_key(&mut state, KeyCode::Char('s')), None);
        assert_eq!(state.notice, Some(Notice::error("Email and password are required.")));
    }

    #[test]
    fn test_submit_carries_typed_credentials() {
        let mut state = LoginState::new();
        type_into(&mut state, "ana@example.com");
        handle_key(&mut state, KeyCode::Down);
        type_into(&mut state, "s3cret-ms");

        let Some(LoginAction::Submit(form)) = handle_key(&mut state, KeyCode::Char('s')) else {
            panic!("expected submit");
        };
        assert_eq!(form.email, "ana@example.com");
        assert_eq!(form.password, "s3cret-ms");

        state.failed("Invalid credentials.".into());
        assert!(state.form.password.is_empty());
        assert_eq!(state.form.email, "ana@example.com");
    }

    #[test]
    fn test_magic_link_and_signup_shortcuts() {
        let mut state = LoginState::with_notice("Please log in or create an account to add a service.");
        handle_key(&mut state, KeyCode::Up);
        type_into(&mut state, "abc");
        assert_eq!(
            handle_key(&mut state, KeyCode::Char('m')),
            Some(LoginAction::MagicLink("abc".into()))
        );
        assert_eq!(handle_key(&mut state, KeyCode::Char('n')), Some(LoginAction::Signup));
    }
}
