use anyhow::Result;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use super::components::{render_footer, render_title, ChoiceCursor, Notice};
use super::read_key;
use crate::directory::{self, area::AREA_OPTIONS, ProviderFilter, SortKey};
use crate::models::{Category, Provider, Subcategory};

pub const LOAD_FAILED: &str = "Could not load data right now.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryFocus {
    Providers,
    Categories,
    Subcategories,
    Areas,
}

impl DirectoryFocus {
    fn next(self) -> Self {
        match self {
            DirectoryFocus::Providers => DirectoryFocus::Categories,
            DirectoryFocus::Categories => DirectoryFocus::Subcategories,
            DirectoryFocus::Subcategories => DirectoryFocus::Areas,
            DirectoryFocus::Areas => DirectoryFocus::Providers,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum DirectoryAction {
    Quit,
    Refresh,
    Open(i64),
    AddService,
    MyServices,
    Bookmarks,
    Login,
    Logout,
    Settings,
}

pub struct DirectoryState {
    providers: Vec<Provider>,
    categories: Vec<Category>,
    filter: ProviderFilter,
    sort: Option<SortKey>,
    focus: DirectoryFocus,
    provider_cursor: ChoiceCursor,
    category_cursor: ChoiceCursor,
    subcategory_cursor: ChoiceCursor,
    area_cursor: ChoiceCursor,
    signed_in_as: Option<String>,
    pub notice: Option<Notice>,
}

impl DirectoryState {
    pub fn new(providers: Vec<Provider>, categories: Vec<Category>) -> Self {
        let featured = directory::featured_categories(&categories, &providers);
        let mut state = Self {
            provider_cursor: ChoiceCursor::new(providers.len()),
            category_cursor: ChoiceCursor::new(featured.len()),
            subcategory_cursor: ChoiceCursor::default(),
            area_cursor: ChoiceCursor::new(AREA_OPTIONS.len()),
            providers,
            categories: featured,
            filter: ProviderFilter::default(),
            sort: None,
            focus: DirectoryFocus::Providers,
            signed_in_as: None,
            notice: None,
        };
        state.subcategory_cursor.clamp(state.subcategories().len());
        state
    }

    /// Directory that failed to load; stays usable so the user can retry
    pub fn failed(message: impl Into<String>) -> Self {
        let mut state = Self::new(Vec::new(), Vec::new());
        state.notice = Some(Notice::error(message));
        state
    }

    /// Swap in fresh data while keeping the user's filters and sort
    pub fn reload(&mut self, providers: Vec<Provider>, categories: Vec<Category>) {
        self.categories = directory::featured_categories(&categories, &providers);
        self.providers = providers;
        self.drop_hidden_subcategories();
        self.refresh_cursors();
    }

    pub fn set_signed_in_as(&mut self, name: Option<String>) {
        self.signed_in_as = name;
    }

    pub fn visible(&self) -> Vec<&Provider> {
        directory::arrange(&self.providers, &self.filter, self.sort)
    }

    /// Subcategories seen on providers, narrowed to the picked categories
    pub fn subcategories(&self) -> Vec<Subcategory> {
        let mut seen: Vec<Subcategory> = Vec::new();
        for sub in self.providers.iter().flat_map(|p| p.subcategories.iter()) {
            let wanted = self.filter.category_ids.is_empty()
                || self.filter.category_ids.contains(&sub.category_id);
            if wanted && !seen.iter().any(|s| s.id == sub.id) {
                seen.push(sub.clone());
            }
        }
        seen
    }

    pub fn selected_provider(&self) -> Option<&Provider> {
        let visible = self.visible();
        self.provider_cursor
            .selected()
            .and_then(|i| visible.get(i).copied())
    }

    /// A subcategory the panel no longer lists can't be unticked, so it stops filtering
    fn drop_hidden_subcategories(&mut self) {
        let shown: Vec<i64> = self.subcategories().iter().map(|s| s.id).collect();
        self.filter.subcategory_ids.retain(|id| shown.contains(id));
    }

    fn refresh_cursors(&mut self) {
        let visible = self.visible().len();
        let subcategories = self.subcategories().len();
        self.provider_cursor.clamp(visible);
        self.category_cursor.clamp(self.categories.len());
        self.subcategory_cursor.clamp(subcategories);
    }

    fn focused_len(&self) -> usize {
        match self.focus {
            DirectoryFocus::Providers => self.visible().len(),
            DirectoryFocus::Categories => self.categories.len(),
            DirectoryFocus::Subcategories => self.subcategories().len(),
            DirectoryFocus::Areas => AREA_OPTIONS.len(),
        }
    }

    fn focused_cursor(&mut self) -> &mut ChoiceCursor {
        match self.focus {
            DirectoryFocus::Providers => &mut self.provider_cursor,
            DirectoryFocus::Categories => &mut self.category_cursor,
            DirectoryFocus::Subcategories => &mut self.subcategory_cursor,
            DirectoryFocus::Areas => &mut self.area_cursor,
        }
    }

    pub fn next(&mut self) {
        let len = self.focused_len();
        self.focused_cursor().next(len);
    }

    pub fn previous(&mut self) {
        let len = self.focused_len();
        self.focused_cursor().previous(len);
    }

    /// Toggle the filter entry under the cursor of the focused panel
    pub fn toggle_selected(&mut self) {
        match self.focus {
            DirectoryFocus::Providers => return,
            DirectoryFocus::Categories => {
                if let Some(category) = self.category_cursor.selected().and_then(|i| self.categories.get(i)) {
                    let id = category.id;
                    self.filter.toggle_category(id);
                    self.drop_hidden_subcategories();
                }
            }
            DirectoryFocus::Subcategories => {
                let subcategories = self.subcategories();
                if let Some(sub) = self.subcategory_cursor.selected().and_then(|i| subcategories.get(i)) {
                    self.filter.toggle_subcategory(sub.id);
                }
            }
            DirectoryFocus::Areas => {
                if let Some(area) = self.area_cursor.selected().and_then(|i| AREA_OPTIONS.get(i)) {
                    self.filter.toggle_area(area);
                }
            }
        }
        self.refresh_cursors();
    }

    pub fn cycle_sort(&mut self) {
        self.sort = SortKey::cycle(self.sort);
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
        self.sort = None;
        self.refresh_cursors();
    }
}

pub fn render_directory<B: Backend>(f: &mut Frame<B>, state: &mut DirectoryState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(f.size());

    let who = state
        .signed_in_as
        .as_deref()
        .map(|name| format!("Signed in as {}", name))
        .unwrap_or_else(|| "Not signed in".to_string());
    let sort = state.sort.map(|k| k.label()).unwrap_or("None");
    render_title(
        f,
        chunks[0],
        &format!("Chivito | Find local services | Sort: {} | {}", sort, who),
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
        .split(chunks[1]);
    render_filters(f, state, columns[0]);
    render_providers(f, state, columns[1]);

    let help = match state.focus {
        DirectoryFocus::Providers => {
            "<Enter> View | <Tab> Filters | <S> Sort | <C> Clear | <R> Reload | <A> Add service | <M> My services | <B> Bookmarks | <L> Log in | <O> Log out | <P> Settings | <Q> Quit"
        }
        _ => "<Space> Toggle | <Up/Down> Move | <Tab> Next panel | <C> Clear | <Q> Quit",
    };
    render_footer(f, chunks[2], help, state.notice.as_ref());
}

fn panel_block(title: &str, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(style)
}

fn check_item(label: &str, checked: bool) -> ListItem<'static> {
    let mark = if checked { "[x] " } else { "[ ] " };
    ListItem::new(format!("{}{}", mark, label))
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn render_filters<B: Backend>(f: &mut Frame<B>, state: &mut DirectoryState, area: Rect) {
    let subcategories = state.subcategories();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(area);

    let categories: Vec<ListItem> = state
        .categories
        .iter()
        .map(|c| check_item(c.label(), state.filter.category_ids.contains(&c.id)))
        .collect();
    let list = List::new(categories)
        .block(panel_block("Categories", state.focus == DirectoryFocus::Categories))
        .highlight_style(highlight());
    f.render_stateful_widget(list, rows[0], state.category_cursor.state_mut());

    let subs: Vec<ListItem> = subcategories
        .iter()
        .map(|s| check_item(&s.name, state.filter.subcategory_ids.contains(&s.id)))
        .collect();
    let list = List::new(subs)
        .block(panel_block("Subcategories", state.focus == DirectoryFocus::Subcategories))
        .highlight_style(highlight());
    f.render_stateful_widget(list, rows[1], state.subcategory_cursor.state_mut());

    let areas: Vec<ListItem> = AREA_OPTIONS
        .iter()
        .map(|a| check_item(a, state.filter.areas.iter().any(|s| s.eq_ignore_ascii_case(a))))
        .collect();
    let list = List::new(areas)
        .block(panel_block("Areas", state.focus == DirectoryFocus::Areas))
        .highlight_style(highlight());
    f.render_stateful_widget(list, rows[2], state.area_cursor.state_mut());
}

fn render_providers<B: Backend>(f: &mut Frame<B>, state: &mut DirectoryState, area: Rect) {
    let items: Vec<ListItem> = state
        .visible()
        .into_iter()
        .map(|provider| {
            let rating = provider
                .effective_rating()
                .map(|r| format!(" {:.1}★", r))
                .unwrap_or_default();
            ListItem::new(vec![
                Spans::from(vec![
                    Span::styled(provider.title(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(rating, Style::default().fg(Color::Yellow)),
                ]),
                Spans::from(Span::styled(
                    format!(
                        "  {} | {} | {}",
                        provider.first_category_name(),
                        provider.display_area(),
                        provider.display_price()
                    ),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();

    let title = if state.filter.is_empty() {
        format!("Providers ({})", state.providers.len())
    } else {
        format!("Providers ({} of {})", items.len(), state.providers.len())
    };

    let list = List::new(items)
        .block(panel_block(&title, state.focus == DirectoryFocus::Providers))
        .highlight_style(highlight());
    f.render_stateful_widget(list, area, state.provider_cursor.state_mut());
}

pub fn handle_key(state: &mut DirectoryState, key: KeyCode) -> Option<DirectoryAction> {
    match key {
        KeyCode::Char('q') => return Some(DirectoryAction::Quit),
        KeyCode::Esc => {
            if state.focus == DirectoryFocus::Providers {
                return Some(DirectoryAction::Quit);
            }
            state.focus = DirectoryFocus::Providers;
        }
        KeyCode::Tab => state.focus = state.focus.next(),
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        KeyCode::Char(' ') => state.toggle_selected(),
        KeyCode::Enter => {
            if state.focus == DirectoryFocus::Providers {
                return state.selected_provider().map(|p| DirectoryAction::Open(p.id));
            }
            state.toggle_selected();
        }
        KeyCode::Char('s') => {
            state.cycle_sort();
            let len = state.visible().len();
            state.provider_cursor.clamp(len);
        }
        KeyCode::Char('c') => state.clear_filters(),
        KeyCode::Char('r') => return Some(DirectoryAction::Refresh),
        KeyCode::Char('a') => return Some(DirectoryAction::AddService),
        KeyCode::Char('m') => return Some(DirectoryAction::MyServices),
        KeyCode::Char('b') => return Some(DirectoryAction::Bookmarks),
        KeyCode::Char('l') => return Some(DirectoryAction::Login),
        KeyCode::Char('o') => return Some(DirectoryAction::Logout),
        KeyCode::Char('p') => return Some(DirectoryAction::Settings),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut DirectoryState) -> Result<Option<DirectoryAction>> {
    Ok(read_key()?.and_then(|key| handle_key(state, key)))
}
