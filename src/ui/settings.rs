use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::KeyCode;
use std::path::PathBuf;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use super::components::{edit_text, field_row, render_confirmation, render_footer, render_title, screen_layout, Notice};
use super::read_key;
use crate::forms::{PasswordForm, ProfileForm};
use crate::models::SessionUser;

pub const SAVE_FAILED: &str = "Could not save your profile right now. Try again.";
pub const PASSWORD_FAILED: &str = "Could not change your password right now. Try again.";
pub const LOGOUT_ALL_FAILED: &str = "Could not log out other devices. You are logged out here.";
pub const DELETE_FAILED: &str = "Could not delete your account right now. Try again.";

#[derive(Debug, PartialEq)]
pub enum SettingsAction {
    Back,
    SaveProfile(ProfileForm),
    ChangePassword(PasswordForm),
    LogoutEverywhere,
    DeleteAccount,
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum SettingsField {
    Name,
    Email,
    Phone,
    Photo,
    CurrentPassword,
    NewPassword,
}

const FIELDS: [SettingsField; 6] = [
    SettingsField::Name,
    SettingsField::Email,
    SettingsField::Phone,
    SettingsField::Photo,
    SettingsField::CurrentPassword,
    SettingsField::NewPassword,
];

pub struct SettingsState {
    pub profile: ProfileForm,
    pub password: PasswordForm,
    photo_path: String,
    pub current_field: SettingsField,
    pub editing: bool,
    show_delete_confirmation: bool,
    session_saved_at: Option<DateTime<Utc>>,
    pub notice: Option<Notice>,
}

impl SettingsState {
    pub fn new(user: Option<&SessionUser>, remembered_phone: Option<String>) -> Self {
        Self {
            profile: ProfileForm::from_user(user, remembered_phone),
            password: PasswordForm::default(),
            photo_path: String::new(),
            current_field: SettingsField::Name,
            editing: false,
            show_delete_confirmation: false,
            session_saved_at: None,
            notice: None,
        }
    }

    pub fn with_session_saved_at(mut self, saved_at: Option<DateTime<Utc>>) -> Self {
        self.session_saved_at = saved_at;
        self
    }

    pub fn title(&self) -> String {
        match self.session_saved_at {
            Some(ts) => format!("Account settings | Signed in since {}", ts.format("%Y-%m-%d %H:%M UTC")),
            None => "Account settings".to_string(),
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    fn index(&self) -> usize {
        FIELDS.iter().position(|f| *f == self.current_field).unwrap_or(0)
    }

    pub fn next_field(&mut self) {
        self.current_field = FIELDS[(self.index() + 1) % FIELDS.len()];
    }

    pub fn previous_field(&mut self) {
        self.current_field = FIELDS[(self.index() + FIELDS.len() - 1) % FIELDS.len()];
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }
        let field_value = match self.current_field {
            SettingsField::Name => &mut self.profile.name,
            SettingsField::Email => &mut self.profile.email,
            SettingsField::Phone => &mut self.profile.phone,
            SettingsField::Photo => &mut self.photo_path,
            SettingsField::CurrentPassword => &mut self.password.current_password,
            SettingsField::NewPassword => &mut self.password.new_password,
        };
        edit_text(field_value, key);
    }

    fn profile_with_photo(&mut self) -> ProfileForm {
        let photo = self.photo_path.trim();
        self.profile.photo = if photo.is_empty() {
            None
        } else {
            Some(PathBuf::from(photo))
        };
        self.profile.clone()
    }

    pub fn profile_saved(&mut self, user: &SessionUser) {
        self.profile.name = user.name.clone();
        self.profile.email = user.email.clone();
        self.photo_path.clear();
        self.profile.photo = None;
        self.notice = Some(Notice::info("Profile saved."));
    }

    pub fn password_changed(&mut self) {
        self.password = PasswordForm::default();
        self.notice = Some(Notice::info("Password updated."));
    }
}

pub fn render_settings<B: Backend>(f: &mut Frame<B>, state: &mut SettingsState) {
    let chunks = screen_layout(f.size());
    let title = state.title();
    render_title(f, chunks[0], &title);

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(4)])
        .split(chunks[1]);

    let row = |field: SettingsField, name: &str, value: &str, masked: bool| {
        let selected = field == state.current_field;
        ListItem::new(field_row(name, value, selected, selected && state.editing, masked))
    };

    let profile = vec![
        row(SettingsField::Name, "Name", &state.profile.name, false),
        row(SettingsField::Email, "Email", &state.profile.email, false),
        row(SettingsField::Phone, "Phone", &state.profile.phone, false),
        row(SettingsField::Photo, "New photo path", &state.photo_path, false),
    ];
    f.render_widget(
        List::new(profile).block(Block::default().borders(Borders::ALL).title("Profile")),
        body[0],
    );

    let password = vec![
        row(SettingsField::CurrentPassword, "Current password", &state.password.current_password, true),
        row(SettingsField::NewPassword, "New password", &state.password.new_password, true),
    ];
    f.render_widget(
        List::new(password).block(Block::default().borders(Borders::ALL).title("Password")),
        body[1],
    );

    let help = if state.editing {
        "<Enter> Save field | <Esc> Cancel editing"
    } else {
        "<Enter> Edit | <S> Save profile | <P> Change password | <O> Log out everywhere | <D> Delete account | <Esc> Back"
    };
    render_footer(f, chunks[2], help, state.notice.as_ref());

    if state.show_delete_confirmation {
        render_confirmation(
            f,
            "Delete account",
            &["Delete your account and every listing you own?", "This cannot be undone."],
        );
    }
}

pub fn handle_key(state: &mut SettingsState, key: KeyCode) -> Option<SettingsAction> {
    if state.show_delete_confirmation {
        match key {
            KeyCode::Char('y') => {
                state.show_delete_confirmation = false;
                return Some(SettingsAction::DeleteAccount);
            }
            KeyCode::Char('n') | KeyCode::Esc => state.show_delete_confirmation = false,
            _ => {}
        }
        return None;
    }

    match key {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(SettingsAction::Back);
            }
        }
        KeyCode::Enter => state.toggle_editing(),
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down if !state.editing => state.next_field(),
        KeyCode::Char('s') if !state.editing => {
            return Some(SettingsAction::SaveProfile(state.profile_with_photo()));
        }
        KeyCode::Char('p') if !state.editing => match state.password.validate() {
            Ok(_) => return Some(SettingsAction::ChangePassword(state.password.clone())),
            Err(err) => state.notice = Some(Notice::error(err.message)),
        },
        KeyCode::Char('o') if !state.editing => return Some(SettingsAction::LogoutEverywhere),
        KeyCode::Char('d') if !state.editing => state.show_delete_confirmation = true,
        _ if state.editing => state.edit_current_field(key),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut SettingsState) -> Result<Option<SettingsAction>> {
    Ok(read_key()?.and_then(|key| handle_key(state, key)))
}
