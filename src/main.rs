mod api;
mod cli;
mod config;
mod directory;
mod forms;
mod models;
mod session;
mod ui;

use std::io;
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use reqwest::StatusCode;
use crossterm::{
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
};
use tracing::{debug, error, info, warn};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::api::ApiClient;
use crate::cli::{Cli, Command};
use crate::models::SessionUser;
use crate::session::{auth, SessionListener, SessionStore};
use crate::ui::components::Notice;
use crate::ui::{
    bookmarks::{self, BookmarksAction, BookmarksState, render_bookmarks},
    directory::{self as directory_screen, DirectoryAction, DirectoryState, render_directory},
    login::{self, LoginAction, LoginState, render_login},
    my_services::{self, MyServicesAction, MyServicesState, render_my_services},
    provider_detail::{self, ProviderDetailAction, ProviderDetailState, render_provider_detail},
    provider_wizard::{self, ProviderWizardAction, ProviderWizardState, render_provider_wizard},
    settings::{self, SettingsAction, SettingsState, render_settings},
    signup::{self, SignupAction, SignupState, render_signup},
};

const PROVIDER_LOAD_FAILED: &str = "Could not load this provider right now.";
const PROVIDER_GONE: &str = "This provider is no longer listed.";
const LOGOUT_FAILED: &str = "Could not log out right now. Try again.";
const SERVICES_LOAD_FAILED: &str = "Could not load your services right now.";
const CATEGORIES_LOAD_FAILED: &str = "Could not load categories right now.";
const BOOKMARK_FAILED: &str = "Could not update bookmark right now.";
const REVIEW_FAILED: &str = "Could not post your review right now.";
const LOGIN_FAILED: &str = "Could not log in right now. Try again.";
const SIGNUP_FAILED: &str = "Could not create your account right now. Try again.";

// Represents the current screen in the app
#[derive(Clone, Copy, PartialEq, Debug)]
enum AppScreen {
    Directory,
    ProviderDetail,
    ProviderWizard,
    MyServices,
    Bookmarks,
    Login,
    Signup,
    Settings,
}

// Main application state
struct AppState {
    api: ApiClient,
    session: SessionStore,
    listener: SessionListener,
    user: Option<SessionUser>,
    session_saved_at: Option<DateTime<Utc>>,
    screen: AppScreen,
    directory_state: DirectoryState,
    provider_detail_state: Option<ProviderDetailState>,
    provider_wizard_state: Option<ProviderWizardState>,
    my_services_state: Option<MyServicesState>,
    bookmarks_state: Option<BookmarksState>,
    login_state: Option<LoginState>,
    signup_state: Option<SignupState>,
    settings_state: Option<SettingsState>,
    // Where Back/Cancel lead from the secondary screens
    detail_origin: AppScreen,
    wizard_origin: AppScreen,
    login_origin: AppScreen,
}

impl AppState {
    fn new(api: ApiClient, session: SessionStore, directory_state: DirectoryState) -> Self {
        let listener = session.subscribe();
        let mut app = Self {
            api,
            session,
            listener,
            user: None,
            session_saved_at: None,
            screen: AppScreen::Directory,
            directory_state,
            provider_detail_state: None,
            provider_wizard_state: None,
            my_services_state: None,
            bookmarks_state: None,
            login_state: None,
            signup_state: None,
            settings_state: None,
            detail_origin: AppScreen::Directory,
            wizard_origin: AppScreen::Directory,
            login_origin: AppScreen::Directory,
        };
        app.refresh_session();
        app
    }

    /// Re-read the stored session after a change notification
    fn refresh_session(&mut self) {
        let session = self.session.current().unwrap_or_else(|err| {
            warn!("Could not read stored session: {:#}", err);
            None
        });
        let (user, token, saved_at) = match session {
            Some(session) => (Some(session.user), session.token, session.saved_at),
            None => (None, None, None),
        };
        self.user = user;
        self.session_saved_at = saved_at;
        self.api.set_token(token);
        self.directory_state
            .set_signed_in_as(self.user.as_ref().map(|u| u.name.clone()));
    }

    /// Show a notice on whatever screen is active
    fn notify(&mut self, notice: Notice) {
        let slot = match self.screen {
            AppScreen::Directory => Some(&mut self.directory_state.notice),
            AppScreen::ProviderDetail => self.provider_detail_state.as_mut().map(|s| &mut s.notice),
            AppScreen::ProviderWizard => self.provider_wizard_state.as_mut().map(|s| &mut s.notice),
            AppScreen::MyServices => self.my_services_state.as_mut().map(|s| &mut s.notice),
            AppScreen::Bookmarks => self.bookmarks_state.as_mut().map(|s| &mut s.notice),
            AppScreen::Login => self.login_state.as_mut().map(|s| &mut s.notice),
            AppScreen::Signup => self.signup_state.as_mut().map(|s| &mut s.notice),
            AppScreen::Settings => self.settings_state.as_mut().map(|s| &mut s.notice),
        };
        match slot {
            Some(slot) => *slot = Some(notice),
            None => {
                self.screen = AppScreen::Directory;
                self.directory_state.notice = Some(notice);
            }
        }
    }

    fn go_to(&mut self, screen: AppScreen) {
        self.screen = screen;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init()?.with_overrides(cli.api_base.clone(), cli.session_dir.clone());
    config::init_logging(&config.log_file)?;
    info!("Using backend {}", config.api_base_url);

    let session = SessionStore::open(&config.session_dir)?;
    debug!("Session files in {}", session.storage_dir().display());
    let api = ApiClient::new(&config.api_base_url, config.request_timeout())?
        .with_token(session.token()?);

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_tui(api, session).await,
        Command::List(args) => cli::list(&api, &args).await,
        Command::Magic { token } => cli::magic(&api, &session, token.as_deref()).await,
        Command::Logout => cli::logout(&session),
    }
}

async fn run_tui(api: ApiClient, session: SessionStore) -> Result<()> {
    let directory_state = load_directory_state(&api).await;

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new(api, session, directory_state);

    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!("Terminal UI stopped: {:#}", err);
        println!("Error: {}", err);
    }

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        if app_state.listener.drain() {
            app_state.refresh_session();
        }

        terminal.draw(|f| match app_state.screen {
            AppScreen::Directory => render_directory(f, &mut app_state.directory_state),
            AppScreen::ProviderDetail => {
                if let Some(state) = &mut app_state.provider_detail_state {
                    render_provider_detail(f, state);
                }
            }
            AppScreen::ProviderWizard => {
                if let Some(state) = &mut app_state.provider_wizard_state {
                    render_provider_wizard(f, state);
                }
            }
            AppScreen::MyServices => {
                if let Some(state) = &mut app_state.my_services_state {
                    render_my_services(f, state);
                }
            }
            AppScreen::Bookmarks => {
                if let Some(state) = &mut app_state.bookmarks_state {
                    render_bookmarks(f, state);
                }
            }
            AppScreen::Login => {
                if let Some(state) = &mut app_state.login_state {
                    render_login(f, state);
                }
            }
            AppScreen::Signup => {
                if let Some(state) = &mut app_state.signup_state {
                    render_signup(f, state);
                }
            }
            AppScreen::Settings => {
                if let Some(state) = &mut app_state.settings_state {
                    render_settings(f, state);
                }
            }
        })?;

        let should_quit = match app_state.screen {
            AppScreen::Directory => handle_directory_screen(app_state).await?,
            AppScreen::ProviderDetail => handle_provider_detail_screen(app_state).await?,
            AppScreen::ProviderWizard => handle_provider_wizard_screen(app_state).await?,
            AppScreen::MyServices => handle_my_services_screen(app_state).await?,
            AppScreen::Bookmarks => handle_bookmarks_screen(app_state).await?,
            AppScreen::Login => handle_login_screen(app_state).await?,
            AppScreen::Signup => handle_signup_screen(app_state).await?,
            AppScreen::Settings => handle_settings_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn load_directory_state(api: &ApiClient) -> DirectoryState {
    match api.load_directory().await {
        Ok((providers, categories)) => DirectoryState::new(providers, categories),
        Err(err) => {
            warn!("Directory load failed: {}", err);
            DirectoryState::failed(err.user_message(directory_screen::LOAD_FAILED))
        }
    }
}

async fn reload_directory(app_state: &mut AppState) {
    match app_state.api.load_directory().await {
        Ok((providers, categories)) => {
            app_state.directory_state.reload(providers, categories);
            app_state.directory_state.notice = None;
        }
        Err(err) => {
            app_state.directory_state.notice =
                Some(Notice::error(err.user_message(directory_screen::LOAD_FAILED)));
        }
    }
}

fn log_out(app_state: &mut AppState) {
    match app_state.session.logout() {
        Ok(()) => {
            app_state.refresh_session();
            app_state.notify(Notice::info("Logged out."));
        }
        Err(err) => {
            error!("Logout failed: {:#}", err);
            app_state.notify(Notice::error(LOGOUT_FAILED));
        }
    }
}

fn go_to_login(app_state: &mut AppState, message: &str) {
    app_state.login_origin = app_state.screen;
    app_state.login_state = Some(LoginState::with_notice(message));
    app_state.go_to(AppScreen::Login);
}

async fn open_provider(app_state: &mut AppState, provider_id: i64, origin: AppScreen) {
    let provider = match app_state.api.get_provider(provider_id).await {
        Ok(provider) => provider,
        Err(err) => {
            let message = if err.status() == Some(StatusCode::NOT_FOUND) {
                PROVIDER_GONE.to_string()
            } else {
                err.user_message(PROVIDER_LOAD_FAILED)
            };
            app_state.notify(Notice::error(message));
            return;
        }
    };

    let user_id = app_state.user.as_ref().map(|u| u.id);
    let bookmarked = if user_id.is_some() {
        app_state.api.is_bookmarked(provider_id).await.unwrap_or_else(|err| {
            warn!("Bookmark lookup failed: {}", err);
            false
        })
    } else {
        false
    };

    let photo_urls: Vec<String> = provider
        .photos()
        .into_iter()
        .filter_map(|p| app_state.api.photo_url(p))
        .collect();

    app_state.provider_detail_state =
        Some(ProviderDetailState::new(provider, photo_urls).with_viewer(user_id, bookmarked));
    app_state.detail_origin = origin;
    app_state.go_to(AppScreen::ProviderDetail);
}

async fn load_subcategories(api: &ApiClient) -> Vec<models::Subcategory> {
    api.list_subcategories().await.unwrap_or_else(|err| {
        warn!("Subcategories unavailable: {}", err);
        Vec::new()
    })
}

async fn open_new_wizard(app_state: &mut AppState) {
    if let Err(message) = provider_wizard::check_can_register(app_state.user.as_ref()) {
        go_to_login(app_state, message);
        return;
    }

    match app_state.api.list_categories().await {
        Ok(categories) => {
            let subcategories = load_subcategories(&app_state.api).await;
            app_state.provider_wizard_state = Some(ProviderWizardState::new(categories, subcategories));
            app_state.wizard_origin = app_state.screen;
            app_state.go_to(AppScreen::ProviderWizard);
        }
        Err(err) => app_state.notify(Notice::error(err.user_message(CATEGORIES_LOAD_FAILED))),
    }
}

async fn open_edit_wizard(app_state: &mut AppState, provider_id: i64) {
    if app_state.user.is_none() {
        go_to_login(app_state, provider_wizard::LOGIN_REQUIRED);
        return;
    }

    match app_state.api.load_provider_for_edit(provider_id).await {
        Ok((provider, categories)) => {
            if let Err(message) = provider_wizard::check_can_edit(app_state.user.as_ref(), &provider) {
                app_state.notify(Notice::error(message));
                return;
            }
            let subcategories = load_subcategories(&app_state.api).await;
            app_state.provider_wizard_state =
                Some(ProviderWizardState::from_existing(&provider, categories, subcategories));
            app_state.wizard_origin = app_state.screen;
            app_state.go_to(AppScreen::ProviderWizard);
        }
        Err(err) => app_state.notify(Notice::error(err.user_message(PROVIDER_LOAD_FAILED))),
    }
}

async fn open_my_services(app_state: &mut AppState) {
    let Some(user_id) = app_state.user.as_ref().map(|u| u.id) else {
        go_to_login(app_state, "Please log in to manage your services.");
        return;
    };

    match app_state.api.list_providers().await {
        Ok(providers) => {
            let mine = directory::owned_by(&providers, user_id);
            app_state.my_services_state = Some(MyServicesState::new(mine));
            app_state.go_to(AppScreen::MyServices);
        }
        Err(err) => app_state.notify(Notice::error(err.user_message(SERVICES_LOAD_FAILED))),
    }
}

async fn open_bookmarks(app_state: &mut AppState) {
    if app_state.user.is_none() {
        go_to_login(app_state, "Please log in to see your bookmarks.");
        return;
    }

    let state = match app_state.api.list_bookmarks().await {
        Ok(providers) => BookmarksState::new(providers),
        Err(err) => BookmarksState::failed(err.user_message(bookmarks::LOAD_FAILED)),
    };
    app_state.bookmarks_state = Some(state);
    app_state.go_to(AppScreen::Bookmarks);
}

/// Land somewhere sensible once a session exists
async fn after_login(app_state: &mut AppState, user: &SessionUser) {
    app_state.refresh_session();
    app_state.login_state = None;
    app_state.signup_state = None;

    let reopen = match (app_state.login_origin, &app_state.provider_detail_state) {
        (AppScreen::ProviderDetail, Some(detail)) => Some(detail.provider_id()),
        _ => None,
    };
    match reopen {
        Some(provider_id) => {
            let origin = app_state.detail_origin;
            app_state.go_to(AppScreen::Directory);
            open_provider(app_state, provider_id, origin).await;
        }
        None => app_state.go_to(AppScreen::Directory),
    }
    app_state.notify(Notice::info(format!("Welcome, {}!", user.name)));
}

async fn handle_directory_screen(app_state: &mut AppState) -> Result<bool> {
    match directory_screen::handle_input(&mut app_state.directory_state)? {
        Some(DirectoryAction::Quit) => return Ok(true),
        Some(DirectoryAction::Refresh) => reload_directory(app_state).await,
        Some(DirectoryAction::Open(id)) => open_provider(app_state, id, AppScreen::Directory).await,
        Some(DirectoryAction::AddService) => open_new_wizard(app_state).await,
        Some(DirectoryAction::MyServices) => open_my_services(app_state).await,
        Some(DirectoryAction::Bookmarks) => open_bookmarks(app_state).await,
        Some(DirectoryAction::Login) => {
            if let Some(user) = &app_state.user {
                let message = format!("Already logged in as {}.", user.name);
                app_state.notify(Notice::info(message));
            } else {
                app_state.login_origin = AppScreen::Directory;
                app_state.login_state = Some(LoginState::new());
                app_state.go_to(AppScreen::Login);
            }
        }
        Some(DirectoryAction::Logout) => log_out(app_state),
        Some(DirectoryAction::Settings) => {
            if app_state.user.is_none() {
                go_to_login(app_state, "Please log in to edit your account.");
            } else {
                let phone = app_state.session.remembered_phone().unwrap_or_default();
                app_state.settings_state = Some(
                    SettingsState::new(app_state.user.as_ref(), phone)
                        .with_session_saved_at(app_state.session_saved_at),
                );
                app_state.go_to(AppScreen::Settings);
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_provider_detail_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.provider_detail_state else {
        app_state.go_to(AppScreen::Directory);
        return Ok(false);
    };

    match provider_detail::handle_input(state)? {
        Some(ProviderDetailAction::Back) => {
            let origin = app_state.detail_origin;
            app_state.go_to(origin);
        }
        Some(ProviderDetailAction::ToggleBookmark { provider_id, bookmarked }) => {
            match app_state.api.toggle_bookmark(provider_id, bookmarked).await {
                Ok(now) => state.set_bookmarked(now),
                Err(err) => state.notice = Some(Notice::error(err.user_message(BOOKMARK_FAILED))),
            }
        }
        Some(ProviderDetailAction::SubmitReview { provider_id, review }) => {
            match app_state.api.create_review(provider_id, &review).await {
                Ok(_) => match app_state.api.get_provider(provider_id).await {
                    Ok(provider) => state.review_saved(provider),
                    Err(err) => {
                        warn!("Could not refresh provider {}: {}", provider_id, err);
                        let current = state.provider().clone();
                        state.review_saved(current);
                    }
                },
                Err(err) => state.notice = Some(Notice::error(err.user_message(REVIEW_FAILED))),
            }
        }
        Some(ProviderDetailAction::Edit(provider_id)) => open_edit_wizard(app_state, provider_id).await,
        Some(ProviderDetailAction::RequireLogin) => {
            go_to_login(app_state, "Please log in to bookmark or review providers.");
        }
        None => {}
    }

    Ok(false)
}

async fn handle_provider_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.provider_wizard_state else {
        app_state.go_to(AppScreen::Directory);
        return Ok(false);
    };

    match provider_wizard::handle_input(state)? {
        Some(ProviderWizardAction::Cancel) => {
            let origin = app_state.wizard_origin;
            app_state.go_to(origin);
        }
        Some(ProviderWizardAction::Submit { provider_id, submission }) => {
            let result = match provider_id {
                Some(id) => app_state.api.update_provider(id, &submission).await,
                None => app_state.api.create_provider(&submission).await,
            };
            match result {
                Ok(()) => {
                    info!("Listing saved: {}", submission.company_name);
                    let message = state.success_message();
                    app_state.provider_wizard_state = None;
                    open_my_services(app_state).await;
                    app_state.notify(Notice::info(message));
                    reload_directory(app_state).await;
                }
                Err(err) => {
                    state.notice = Some(Notice::error(err.user_message(state.failure_fallback())));
                }
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_my_services_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.my_services_state else {
        app_state.go_to(AppScreen::Directory);
        return Ok(false);
    };

    match my_services::handle_input(state)? {
        Some(MyServicesAction::Back) => app_state.go_to(AppScreen::Directory),
        Some(MyServicesAction::NewService) => open_new_wizard(app_state).await,
        Some(MyServicesAction::EditService(id)) => open_edit_wizard(app_state, id).await,
        Some(MyServicesAction::DeleteService(id)) => match app_state.api.delete_provider(id).await {
            Ok(()) => {
                state.remove(id);
                reload_directory(app_state).await;
            }
            Err(err) => state.notice = Some(Notice::error(err.user_message(my_services::DELETE_FAILED))),
        },
        Some(MyServicesAction::ViewService(id)) => open_provider(app_state, id, AppScreen::MyServices).await,
        None => {}
    }

    Ok(false)
}

async fn handle_bookmarks_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.bookmarks_state else {
        app_state.go_to(AppScreen::Directory);
        return Ok(false);
    };

    match bookmarks::handle_input(state)? {
        Some(BookmarksAction::Back) => app_state.go_to(AppScreen::Directory),
        Some(BookmarksAction::Open(id)) => open_provider(app_state, id, AppScreen::Bookmarks).await,
        Some(BookmarksAction::Remove(id)) => match app_state.api.remove_bookmark(id).await {
            Ok(()) => state.removed(id),
            Err(err) => state.notice = Some(Notice::error(err.user_message(BOOKMARK_FAILED))),
        },
        None => {}
    }

    Ok(false)
}

async fn handle_login_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.login_state else {
        app_state.go_to(AppScreen::Directory);
        return Ok(false);
    };

    match login::handle_input(state)? {
        Some(LoginAction::Cancel) => {
            let origin = app_state.login_origin;
            app_state.login_state = None;
            app_state.go_to(origin);
        }
        Some(LoginAction::Submit(form)) => {
            match auth::login(&app_state.api, &app_state.session, &form).await {
                Ok(user) => after_login(app_state, &user).await,
                Err(err) => state.failed(err.user_message(LOGIN_FAILED)),
            }
        }
        Some(LoginAction::MagicLink(token)) => {
            match auth::redeem_magic_link(&app_state.api, &app_state.session, Some(&token)).await {
                Ok(user) => after_login(app_state, &user).await,
                Err(err) => {
                    state.notice = Some(Notice::error(err.user_message(auth::MAGIC_LINK_FAILED)));
                }
            }
        }
        Some(LoginAction::Signup) => {
            app_state.signup_state = Some(SignupState::new());
            app_state.go_to(AppScreen::Signup);
        }
        None => {}
    }

    Ok(false)
}

async fn handle_signup_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.signup_state else {
        app_state.go_to(AppScreen::Directory);
        return Ok(false);
    };

    match signup::handle_input(state)? {
        Some(SignupAction::Cancel) => {
            app_state.signup_state = None;
            if app_state.login_state.is_none() {
                app_state.login_state = Some(LoginState::new());
            }
            app_state.go_to(AppScreen::Login);
        }
        Some(SignupAction::Submit(form)) => {
            match auth::signup(&app_state.api, &app_state.session, &form).await {
                Ok(user) => after_login(app_state, &user).await,
                Err(err) => state.notice = Some(Notice::error(err.user_message(SIGNUP_FAILED))),
            }
        }
        None => {}
    }

    Ok(false)
}

async fn handle_settings_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.settings_state else {
        app_state.go_to(AppScreen::Directory);
        return Ok(false);
    };

    match settings::handle_input(state)? {
        Some(SettingsAction::Back) => app_state.go_to(AppScreen::Directory),
        Some(SettingsAction::SaveProfile(form)) => {
            match auth::save_profile(&app_state.api, &app_state.session, &form).await {
                Ok(user) => state.profile_saved(&user),
                Err(err) => state.notice = Some(Notice::error(err.user_message(settings::SAVE_FAILED))),
            }
        }
        Some(SettingsAction::ChangePassword(form)) => {
            match auth::change_password(&app_state.api, &form).await {
                Ok(()) => state.password_changed(),
                Err(err) => {
                    state.notice = Some(Notice::error(err.user_message(settings::PASSWORD_FAILED)));
                }
            }
        }
        Some(SettingsAction::LogoutEverywhere) => {
            let result = auth::logout_everywhere(&app_state.api, &app_state.session).await;
            app_state.settings_state = None;
            app_state.refresh_session();
            app_state.go_to(AppScreen::Directory);
            match result {
                Ok(()) => app_state.notify(Notice::info("Logged out on every device.")),
                Err(err) => app_state.notify(Notice::error(err.user_message(settings::LOGOUT_ALL_FAILED))),
            }
        }
        Some(SettingsAction::DeleteAccount) => {
            match auth::delete_account(&app_state.api, &app_state.session).await {
                Ok(()) => {
                    app_state.settings_state = None;
                    app_state.refresh_session();
                    app_state.go_to(AppScreen::Directory);
                    app_state.notify(Notice::info("Your account was deleted."));
                    reload_directory(app_state).await;
                }
                Err(err) => state.notice = Some(Notice::error(err.user_message(settings::DELETE_FAILED))),
            }
        }
        None => {}
    }

    Ok(false)
}
