use anyhow::Result;
use crossterm::event::KeyCode;
use std::path::PathBuf;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::components::{edit_text, field_row, render_footer, render_title, Notice};
use super::read_key;
use crate::directory::{area::AREA_OPTIONS, sorted_categories};
use crate::forms::{FormError, ProviderForm, ProviderSubmission, SubmitMode, MAX_PHOTOS};
use crate::models::{Category, Provider, SessionUser, Subcategory};

pub const LOGIN_REQUIRED: &str = "Please log in or create an account to add a service.";
pub const NOT_OWNER: &str = "You do not have permission to edit this service.";
pub const SUBMIT_FAILED: &str = "Could not submit right now. Try again.";
pub const UPDATE_FAILED: &str = "Could not update right now. Try again.";
pub const SUBMITTED: &str = "Service submitted! Status: pending.";
pub const UPDATED: &str = "Service updated.";

/// Registering needs a session
pub fn check_can_register(user: Option<&SessionUser>) -> Result<(), &'static str> {
    match user {
        Some(_) => Ok(()),
        None => Err(LOGIN_REQUIRED),
    }
}

/// Editing needs a session and ownership of the listing
pub fn check_can_edit(user: Option<&SessionUser>, provider: &Provider) -> Result<(), &'static str> {
    let user = user.ok_or(LOGIN_REQUIRED)?;
    if provider.is_owned_by(user.id) {
        Ok(())
    } else {
        Err(NOT_OWNER)
    }
}

pub enum ProviderWizardAction {
    Cancel,
    Submit {
        provider_id: Option<i64>,
        submission: ProviderSubmission,
    },
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum ProviderField {
    Name,
    CompanyName,
    Phone,
    Bio,
    Price,
    Areas,
    Categories,
    Subcategories,
    Photos,
}

const FIELDS: [ProviderField; 9] = [
    ProviderField::Name,
    ProviderField::CompanyName,
    ProviderField::Phone,
    ProviderField::Bio,
    ProviderField::Price,
    ProviderField::Areas,
    ProviderField::Categories,
    ProviderField::Subcategories,
    ProviderField::Photos,
];

impl ProviderField {
    fn label(&self) -> &'static str {
        match self {
            ProviderField::Name => "Name",
            ProviderField::CompanyName => "Company name",
            ProviderField::Phone => "Phone",
            ProviderField::Bio => "Bio",
            ProviderField::Price => "Price",
            ProviderField::Areas => "Service areas",
            ProviderField::Categories => "Categories",
            ProviderField::Subcategories => "Subcategories",
            ProviderField::Photos => "Photos",
        }
    }

    /// Field name used by validation errors
    fn key(&self) -> &'static str {
        match self {
            ProviderField::Name => "name",
            ProviderField::CompanyName => "company_name",
            ProviderField::Phone => "phone",
            ProviderField::Bio => "bio",
            ProviderField::Price => "price",
            ProviderField::Areas => "areas",
            ProviderField::Categories => "categories",
            ProviderField::Subcategories => "subcategories",
            ProviderField::Photos => "photos",
        }
    }

    fn is_choice(&self) -> bool {
        matches!(
            self,
            ProviderField::Areas | ProviderField::Categories | ProviderField::Subcategories
        )
    }
}

pub struct ProviderWizardState {
    mode: SubmitMode,
    provider_id: Option<i64>,
    pub form: ProviderForm,
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
    pub current_field: ProviderField,
    pub editing: bool,
    option_cursor: usize,
    photo_path: String,
    error: Option<FormError>,
    pub notice: Option<Notice>,
}

impl ProviderWizardState {
    pub fn new(categories: Vec<Category>, subcategories: Vec<Subcategory>) -> Self {
        Self {
            mode: SubmitMode::Create,
            provider_id: None,
            form: ProviderForm::default(),
            categories: sorted_categories(&categories),
            subcategories,
            current_field: ProviderField::Name,
            editing: false,
            option_cursor: 0,
            photo_path: String::new(),
            error: None,
            notice: None,
        }
    }

    pub fn from_existing(provider: &Provider, categories: Vec<Category>, subcategories: Vec<Subcategory>) -> Self {
        Self {
            mode: SubmitMode::Edit,
            provider_id: Some(provider.id),
            form: ProviderForm::from_provider(provider),
            ..Self::new(categories, subcategories)
        }
    }

    /// Message for a failed submission, per mode
    pub fn failure_fallback(&self) -> &'static str {
        match self.mode {
            SubmitMode::Create => SUBMIT_FAILED,
            SubmitMode::Edit => UPDATE_FAILED,
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self.mode {
            SubmitMode::Create => SUBMITTED,
            SubmitMode::Edit => UPDATED,
        }
    }

    /// Subcategories belonging to the picked categories
    pub fn available_subcategories(&self) -> Vec<&Subcategory> {
        self.subcategories
            .iter()
            .filter(|s| self.form.category_ids.contains(&s.category_id))
            .collect()
    }

    fn option_labels(&self) -> Vec<(String, bool)> {
        match self.current_field {
            ProviderField::Areas => AREA_OPTIONS
                .iter()
                .map(|a| (a.to_string(), self.form.areas.iter().any(|s| s == a)))
                .collect(),
            ProviderField::Categories => self
                .categories
                .iter()
                .map(|c| (c.label().to_string(), self.form.category_ids.contains(&c.id)))
                .collect(),
            ProviderField::Subcategories => self
                .available_subcategories()
                .into_iter()
                .map(|s| (s.name.clone(), self.form.subcategory_ids.contains(&s.id)))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        self.option_cursor = 0;
    }

    pub fn next_field(&mut self) {
        let i = FIELDS.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = FIELDS[(i + 1) % FIELDS.len()];
    }

    pub fn previous_field(&mut self) {
        let i = FIELDS.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = FIELDS[(i + FIELDS.len() - 1) % FIELDS.len()];
    }

    fn move_option(&mut self, forward: bool) {
        let len = self.option_labels().len();
        if len == 0 {
            return;
        }
        self.option_cursor = if forward {
            (self.option_cursor + 1) % len
        } else {
            (self.option_cursor + len - 1) % len
        };
    }

    fn toggle_option(&mut self) {
        match self.current_field {
            ProviderField::Areas => {
                if let Some(area) = AREA_OPTIONS.get(self.option_cursor) {
                    self.form.toggle_area(area);
                }
            }
            ProviderField::Categories => {
                if let Some(id) = self.categories.get(self.option_cursor).map(|c| c.id) {
                    self.form.toggle_category(id);
                    self.drop_orphan_subcategories();
                }
            }
            ProviderField::Subcategories => {
                let id = self.available_subcategories().get(self.option_cursor).map(|s| s.id);
                if let Some(id) = id {
                    self.form.toggle_subcategory(id);
                }
            }
            _ => {}
        }
    }

    // Keep only subcategories whose category is still picked. Without a
    // catalogue there is nothing to check against.
    fn drop_orphan_subcategories(&mut self) {
        if self.subcategories.is_empty() {
            return;
        }
        let allowed: Vec<i64> = self.available_subcategories().iter().map(|s| s.id).collect();
        self.form.subcategory_ids.retain(|id| allowed.contains(id));
    }

    fn attach_photo(&mut self) {
        let path = self.photo_path.trim();
        if path.is_empty() {
            return;
        }
        if self.form.add_photo(PathBuf::from(path)) {
            self.photo_path.clear();
            self.notice = None;
        } else {
            self.notice = Some(Notice::error(format!("You can attach up to {} photos.", MAX_PHOTOS)));
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            ProviderField::Name => &mut self.form.name,
            ProviderField::CompanyName => &mut self.form.company_name,
            ProviderField::Phone => &mut self.form.phone,
            ProviderField::Bio => &mut self.form.bio,
            ProviderField::Price => &mut self.form.price,
            ProviderField::Photos => &mut self.photo_path,
            ProviderField::Areas | ProviderField::Categories | ProviderField::Subcategories => {
                match key {
                    KeyCode::Left => self.move_option(false),
                    KeyCode::Right | KeyCode::Tab => self.move_option(true),
                    KeyCode::Char(' ') => self.toggle_option(),
                    _ => {}
                }
                return;
            }
        };
        edit_text(field_value, key);
    }

    /// Run validation; on failure jump to the offending field
    pub fn submit(&mut self) -> Option<ProviderSubmission> {
        match self.form.validate(self.mode) {
            Ok(submission) => {
                self.error = None;
                Some(submission)
            }
            Err(err) => {
                if let Some(field) = FIELDS.iter().find(|f| f.key() == err.field) {
                    self.current_field = *field;
                }
                self.error = Some(err);
                None
            }
        }
    }
}

pub fn render_provider_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ProviderWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(4),
        ])
        .split(f.size());

    let title = match state.mode {
        SubmitMode::Create => "Register your service",
        SubmitMode::Edit => "Edit your service",
    };
    render_title(f, chunks[0], title);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
    render_form(f, state, body[0]);
    render_options(f, state, body[1]);

    let help = if state.editing && state.current_field.is_choice() {
        "<Left/Right> Move | <Space> Toggle | <Enter> Done"
    } else if state.editing && state.current_field == ProviderField::Photos {
        "Type a file path | <Enter> Attach | <Esc> Done"
    } else if state.editing {
        "<Enter> Save field | <Esc> Cancel editing"
    } else {
        "<Enter> Edit field | <Up/Down> Navigate | <X> Remove last photo | <S> Submit | <Esc> Cancel"
    };
    let notice = state
        .error
        .as_ref()
        .map(|e| Notice::error(e.message.clone()))
        .or_else(|| state.notice.clone());
    render_footer(f, chunks[2], help, notice.as_ref());
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ProviderWizardState, area: Rect) {
    let category_names: Vec<&str> = state
        .categories
        .iter()
        .filter(|c| state.form.category_ids.contains(&c.id))
        .map(|c| c.label())
        .collect();
    let subcategory_names: Vec<&str> = state
        .subcategories
        .iter()
        .filter(|s| state.form.subcategory_ids.contains(&s.id))
        .map(|s| s.name.as_str())
        .collect();
    let mut photos: Vec<String> = state
        .form
        .photos
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    if state.editing && state.current_field == ProviderField::Photos {
        photos.push(state.photo_path.clone());
    }

    let values: Vec<String> = FIELDS
        .iter()
        .map(|field| match field {
            ProviderField::Name => state.form.name.clone(),
            ProviderField::CompanyName => state.form.company_name.clone(),
            ProviderField::Phone => state.form.phone.clone(),
            ProviderField::Bio => state.form.bio.clone(),
            ProviderField::Price => state.form.price.clone(),
            ProviderField::Areas => state.form.areas.join(", "),
            ProviderField::Categories => category_names.join(", "),
            ProviderField::Subcategories => subcategory_names.join(", "),
            ProviderField::Photos => format!("({}/{}) {}", state.form.photos.len(), MAX_PHOTOS, photos.join(", ")),
        })
        .collect();

    let items: Vec<ListItem> = FIELDS
        .iter()
        .zip(values.iter())
        .map(|(field, value)| {
            let selected = *field == state.current_field;
            let editing = state.editing && !field.is_choice();
            let mut row = field_row(field.label(), value, selected, editing, false);
            if state.error.as_ref().is_some_and(|e| e.field == field.key()) {
                row.0.push(Span::styled("  !", Style::default().fg(Color::Red)));
            }
            ListItem::new(row)
        })
        .collect();

    let form = List::new(items).block(Block::default().borders(Borders::ALL).title("Listing details"));
    f.render_widget(form, area);
}

fn render_options<B: Backend>(f: &mut Frame<B>, state: &ProviderWizardState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Options");
    if !state.current_field.is_choice() {
        let hint = Paragraph::new("Select a list field and press Enter to pick options.")
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(hint, area);
        return;
    }

    let items: Vec<ListItem> = state
        .option_labels()
        .into_iter()
        .enumerate()
        .map(|(i, (label, checked))| {
            let mark = if checked { "[x] " } else { "[ ] " };
            let style = if state.editing && i == state.option_cursor {
                Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Spans::from(Span::styled(format!("{}{}", mark, label), style)))
        })
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

pub fn handle_key(state: &mut ProviderWizardState, key: KeyCode) -> Option<ProviderWizardAction> {
    match key {
        KeyCode::Esc => {
            if state.editing {
                state.toggle_editing();
            } else {
                return Some(ProviderWizardAction::Cancel);
            }
        }
        KeyCode::Enter => {
            if state.editing && state.current_field == ProviderField::Photos {
                state.attach_photo();
            } else {
                state.toggle_editing();
            }
        }
        KeyCode::Up if !state.editing => state.previous_field(),
        KeyCode::Down if !state.editing => state.next_field(),
        KeyCode::Char('x') if !state.editing => state.form.remove_last_photo(),
        KeyCode::Char('s') if !state.editing => {
            if let Some(submission) = state.submit() {
                return Some(ProviderWizardAction::Submit {
                    provider_id: state.provider_id,
                    submission,
                });
            }
        }
        _ if state.editing => state.edit_current_field(key),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut ProviderWizardState) -> Result<Option<ProviderWizardAction>> {
    Ok(read_key()?.and_then(|key| handle_key(state, key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<Category> {
        vec![
            Category { id: 5, name: "Plumbing".into(), slug: "plumbing".into() },
            Category { id: 2, name: "Cleaning".into(), slug: "cleaning".into() },
        ]
    }

    fn subcategories() -> Vec<Subcategory> {
        vec![
            Subcategory { id: 20, category_id: 2, name: "Windows".into(), slug: String::new() },
            Subcategory { id: 50, category_id: 5, name: "Leaks".into(), slug: String::new() },
        ]
    }

    fn user(id: i64) -> SessionUser {
        SessionUser {
            id,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            photo: None,
            first_name: None,
            last_name: None,
            phone_number: None,
        }
    }

    fn type_text(state: &mut ProviderWizardState, text: &str) {
        handle_key(state, KeyCode::Enter);
        for c in text.chars() {
            handle_key(state, KeyCode::Char(c));
        }
        handle_key(state, KeyCode::Enter);
    }

    #[test]
    fn test_guards() {
        assert_eq!(check_can_register(None), Err(LOGIN_REQUIRED));
        assert!(check_can_register(Some(&user(1))).is_ok());

        let provider = Provider { id: 3, user_id: Some(7), ..Default::default() };
        assert_eq!(check_can_edit(None, &provider), Err(LOGIN_REQUIRED));
        assert_eq!(check_can_edit(Some(&user(1)), &provider), Err(NOT_OWNER));
        assert!(check_can_edit(Some(&user(7)), &provider).is_ok());
    }

    #[test]
    fn test_empty_company_blocks_submit_and_focuses_field() {
        let mut state = ProviderWizardState::new(categories(), subcategories());
        type_text(&mut state, "Jane");
        state.next_field();
        state.next_field();
        type_text(&mut state, "555");

        assert!(handle_key(&mut state, KeyCode::Char('s')).is_none());
        let err = state.error.as_ref().unwrap();
        assert_eq!(err.message, "Name, company name, and phone are required.");
        assert_eq!(state.current_field, ProviderField::CompanyName);
    }

    #[test]
    fn test_full_registration_flow() {
        let mut state = ProviderWizardState::new(categories(), subcategories());
        type_text(&mut state, "Jane");
        state.next_field();
        type_text(&mut state, "Doe Repairs");
        state.next_field();
        type_text(&mut state, "555-0101");

        // Categories are sorted by label: Cleaning, Plumbing
        state.current_field = ProviderField::Categories;
        handle_key(&mut state, KeyCode::Enter);
        handle_key(&mut state, KeyCode::Right);
        handle_key(&mut state, KeyCode::Char(' '));
        handle_key(&mut state, KeyCode::Enter);
        assert_eq!(state.form.category_ids, vec![5]);

        state.current_field = ProviderField::Subcategories;
        handle_key(&mut state, KeyCode::Enter);
        handle_key(&mut state, KeyCode::Char(' '));
        handle_key(&mut state, KeyCode::Enter);
        assert_eq!(state.form.subcategory_ids, vec![50]);

        state.current_field = ProviderField::Areas;
        handle_key(&mut state, KeyCode::Enter);
        handle_key(&mut state, KeyCode::Char(' '));
        handle_key(&mut state, KeyCode::Enter);

        match handle_key(&mut state, KeyCode::Char('s')) {
            Some(ProviderWizardAction::Submit { provider_id, submission }) => {
                assert_eq!(provider_id, None);
                assert_eq!(submission.company_name, "Doe Repairs");
                assert_eq!(submission.city.as_deref(), Some("North"));
                assert_eq!(submission.subcategory_ids, vec![50]);
            }
            _ => panic!("expected submit"),
        }
        assert_eq!(state.success_message(), SUBMITTED);
    }

    #[test]
    fn test_unpicking_category_drops_its_subcategories() {
        let mut state = ProviderWizardState::new(categories(), subcategories());
        state.form.toggle_category(5);
        state.form.toggle_subcategory(50);

        state.current_field = ProviderField::Categories;
        handle_key(&mut state, KeyCode::Enter);
        handle_key(&mut state, KeyCode::Right);
        handle_key(&mut state, KeyCode::Char(' '));

        assert!(state.form.category_ids.is_empty());
        assert!(state.form.subcategory_ids.is_empty());
    }

    #[test]
    fn test_photo_paths_attach_up_to_limit() {
        let mut state = ProviderWizardState::new(categories(), subcategories());
        state.current_field = ProviderField::Photos;
        handle_key(&mut state, KeyCode::Enter);
        for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
            for c in name.chars() {
                handle_key(&mut state, KeyCode::Char(c));
            }
            handle_key(&mut state, KeyCode::Enter);
        }
        assert_eq!(state.form.photos.len(), MAX_PHOTOS);
        assert_eq!(state.notice, Some(Notice::error("You can attach up to 3 photos.")));

        handle_key(&mut state, KeyCode::Esc);
        handle_key(&mut state, KeyCode::Char('x'));
        assert_eq!(state.form.photos.len(), 2);
    }

    #[test]
    fn test_edit_mode_prefills_and_uses_update_messages() {
        let provider = Provider {
            id: 9,
            name: "Luis".into(),
            company_name: "Luis Plumbing".into(),
            phone: "787".into(),
            categories: vec![categories().remove(0)],
            ..Default::default()
        };
        let mut state = ProviderWizardState::from_existing(&provider, categories(), subcategories());
        assert_eq!(state.mode, SubmitMode::Edit);
        assert_eq!(state.failure_fallback(), UPDATE_FAILED);

        match handle_key(&mut state, KeyCode::Char('s')) {
            Some(ProviderWizardAction::Submit { provider_id, submission }) => {
                assert_eq!(provider_id, Some(9));
                assert_eq!(submission.mode, SubmitMode::Edit);
            }
            _ => panic!("expected submit"),
        }
    }
}
