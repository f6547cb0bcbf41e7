use anyhow::Result;
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::components::{edit_text, render_footer, render_title, screen_layout, Notice};
use super::read_key;
use crate::forms::{ReviewForm, ReviewSubmission};
use crate::models::Provider;

#[derive(Debug, PartialEq)]
pub enum ProviderDetailAction {
    Back,
    ToggleBookmark { provider_id: i64, bookmarked: bool },
    SubmitReview { provider_id: i64, review: ReviewSubmission },
    Edit(i64),
    RequireLogin,
}

pub struct ProviderDetailState {
    provider: Provider,
    photo_urls: Vec<String>,
    bookmarked: bool,
    logged_in: bool,
    can_edit: bool,
    review: Option<ReviewForm>,
    pub notice: Option<Notice>,
}

impl ProviderDetailState {
    pub fn new(provider: Provider, photo_urls: Vec<String>) -> Self {
        Self {
            provider,
            photo_urls,
            bookmarked: false,
            logged_in: false,
            can_edit: false,
            review: None,
            notice: None,
        }
    }

    /// Session-dependent bits: bookmark flag and edit rights
    pub fn with_viewer(mut self, user_id: Option<i64>, bookmarked: bool) -> Self {
        self.logged_in = user_id.is_some();
        self.can_edit = user_id.is_some_and(|id| self.provider.is_owned_by(id));
        self.bookmarked = bookmarked;
        self
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn provider_id(&self) -> i64 {
        self.provider.id
    }

    pub fn set_bookmarked(&mut self, bookmarked: bool) {
        self.bookmarked = bookmarked;
        self.notice = Some(Notice::info(if bookmarked {
            "Saved to bookmarks."
        } else {
            "Removed from bookmarks."
        }));
    }

    /// Replace the provider after a review lands so the list and rating refresh
    pub fn review_saved(&mut self, provider: Provider) {
        self.provider = provider;
        self.review = None;
        self.notice = Some(Notice::info("Thanks for your review!"));
    }
}

pub fn render_provider_detail<B: Backend>(f: &mut Frame<B>, state: &mut ProviderDetailState) {
    let chunks = screen_layout(f.size());
    render_title(f, chunks[0], &state.provider.title());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let provider = &state.provider;
    let label = Style::default().fg(Color::Yellow);
    let mut lines = vec![
        Spans::from(vec![Span::styled("Status: ", label), Span::raw(provider.status.label())]),
        Spans::from(vec![Span::styled("Phone: ", label), Span::raw(provider.phone.clone())]),
        Spans::from(vec![Span::styled("Area: ", label), Span::raw(provider.display_area().to_string())]),
        Spans::from(vec![Span::styled("Price: ", label), Span::raw(provider.display_price())]),
        Spans::from(vec![
            Span::styled("Rating: ", label),
            Span::raw(
                provider
                    .effective_rating()
                    .map(|r| format!("{:.1} / 5", r))
                    .unwrap_or_else(|| "No ratings yet".to_string()),
            ),
        ]),
        Spans::from(vec![
            Span::styled("Services: ", label),
            Span::raw(
                provider
                    .categories
                    .iter()
                    .map(|c| c.label().to_string())
                    .chain(provider.subcategories.iter().map(|s| s.name.clone()))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]),
    ];
    let tags = provider.tag_list();
    if !tags.is_empty() {
        lines.push(Spans::from(vec![Span::styled("Tags: ", label), Span::raw(tags.join(", "))]));
    }
    if state.bookmarked {
        lines.push(Spans::from(Span::styled("★ Bookmarked", Style::default().fg(Color::Green))));
    }
    lines.push(Spans::from(""));
    lines.push(Spans::from(provider.bio.clone().unwrap_or_default()));
    for url in &state.photo_urls {
        lines.push(Spans::from(Span::styled(url.clone(), Style::default().fg(Color::Blue))));
    }

    let details = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("About").borders(Borders::ALL));
    f.render_widget(details, body[0]);

    let mut reviews = Vec::new();
    if let Some(form) = &state.review {
        reviews.push(Spans::from(vec![
            Span::styled("Your rating: ", label),
            Span::styled(
                format!("{}{}", "★".repeat(form.rating as usize), "☆".repeat(5 - form.rating as usize)),
                Style::default().fg(Color::Yellow),
            ),
        ]));
        reviews.push(Spans::from(vec![
            Span::styled("Comment: ", label),
            Span::styled(format!("{}|", form.comment), Style::default().add_modifier(Modifier::BOLD)),
        ]));
        reviews.push(Spans::from(""));
    }
    if provider.reviews.is_empty() {
        reviews.push(Spans::from("No reviews yet."));
    }
    for review in &provider.reviews {
        let who = review.user_name.clone().unwrap_or_else(|| "Anonymous".to_string());
        let when = review
            .created_at
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        reviews.push(Spans::from(vec![
            Span::styled("★".repeat(review.rating as usize), Style::default().fg(Color::Yellow)),
            Span::raw(format!(" {} {}", who, when)),
        ]));
        if let Some(comment) = &review.comment {
            reviews.push(Spans::from(format!("  {}", comment)));
        }
    }
    let reviews = Paragraph::new(reviews)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Reviews").borders(Borders::ALL));
    f.render_widget(reviews, body[1]);

    let help = if state.review.is_some() {
        "<1-5> Rating | Type comment | <Enter> Submit review | <Esc> Cancel"
    } else if state.can_edit {
        "<B> Bookmark | <R> Write review | <E> Edit listing | <Esc> Back"
    } else {
        "<B> Bookmark | <R> Write review | <Esc> Back"
    };
    render_footer(f, chunks[2], help, state.notice.as_ref());
}

fn handle_review_key(state: &mut ProviderDetailState, key: KeyCode) -> Option<ProviderDetailAction> {
    let form = state.review.as_mut()?;
    match key {
        KeyCode::Esc => {
            state.review = None;
            state.notice = None;
        }
        KeyCode::Enter => match form.validate() {
            Ok(review) => {
                return Some(ProviderDetailAction::SubmitReview {
                    provider_id: state.provider.id,
                    review,
                });
            }
            Err(err) => state.notice = Some(Notice::error(err.message)),
        },
        // Digits set the rating until the comment has started
        KeyCode::Char(c @ '1'..='5') if form.comment.is_empty() => {
            form.set_rating(c as u8 - b'0');
        }
        other => edit_text(&mut form.comment, other),
    }
    None
}

pub fn handle_key(state: &mut ProviderDetailState, key: KeyCode) -> Option<ProviderDetailAction> {
    if state.review.is_some() {
        return handle_review_key(state, key);
    }

    match key {
        KeyCode::Esc | KeyCode::Char('q') => Some(ProviderDetailAction::Back),
        KeyCode::Char('b') => {
            if !state.logged_in {
                return Some(ProviderDetailAction::RequireLogin);
            }
            Some(ProviderDetailAction::ToggleBookmark {
                provider_id: state.provider.id,
                bookmarked: state.bookmarked,
            })
        }
        KeyCode::Char('r') => {
            if !state.logged_in {
                return Some(ProviderDetailAction::RequireLogin);
            }
            state.review = Some(ReviewForm::default());
            state.notice = None;
            None
        }
        KeyCode::Char('e') if state.can_edit => Some(ProviderDetailAction::Edit(state.provider.id)),
        _ => None,
    }
}

pub fn handle_input(state: &mut ProviderDetailState) -> Result<Option<ProviderDetailAction>> {
    Ok(read_key()?.and_then(|key| handle_key(state, key)))
}
