use tracing::{info, warn};

use super::SessionStore;
use crate::api::{ApiClient, ApiError};
use crate::forms::{FormError, FormErrors, LoginForm, PasswordForm, ProfileForm, SignupForm};
use crate::models::{AuthResponse, SessionUser};

pub const MAGIC_LINK_MISSING: &str = "Missing magic link token.";
pub const MAGIC_LINK_FAILED: &str = "Could not validate magic link.";

/// Anything that can stop a session-changing action
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Invalid(#[from] FormError),

    #[error("{}", SignupForm::INCOMPLETE)]
    Incomplete(FormErrors),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{}", MAGIC_LINK_MISSING)]
    MissingToken,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AuthError {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AuthError::Api(err) => err.user_message(fallback),
            AuthError::Storage(_) => fallback.to_string(),
            other => other.to_string(),
        }
    }
}

/// Resolve the session user from an auth response, fetching the profile
/// with the fresh token when the backend left it out
async fn resolve_user(api: &ApiClient, auth: &AuthResponse) -> Result<SessionUser, ApiError> {
    match &auth.user {
        Some(profile) => Ok(profile.clone().into_session_user()),
        None => {
            let authed = api.clone().with_token(Some(auth.token.clone()));
            Ok(authed.get_profile().await?.into_session_user())
        }
    }
}

pub async fn login(
    api: &ApiClient,
    store: &SessionStore,
    form: &LoginForm,
) -> Result<SessionUser, AuthError> {
    let request = form.validate()?;
    let auth = api.login(&request).await?;
    let user = resolve_user(api, &auth).await?;
    store.login(&user, &auth.token)?;
    Ok(user)
}

pub async fn signup(
    api: &ApiClient,
    store: &SessionStore,
    form: &SignupForm,
) -> Result<SessionUser, AuthError> {
    let submission = form.validate().map_err(AuthError::Incomplete)?;
    let auth = api.signup(&submission).await?;
    let user = resolve_user(api, &auth).await?;
    store.login(&user, &auth.token)?;
    Ok(user)
}

/// Exchange a magic-link token for a stored session
pub async fn redeem_magic_link(
    api: &ApiClient,
    store: &SessionStore,
    token: Option<&str>,
) -> Result<SessionUser, AuthError> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    info!("Validating magic link");
    let authed = api.clone().with_token(Some(token.to_string()));
    let user = authed.get_profile().await?.into_session_user();
    store.login(&user, token)?;
    Ok(user)
}

/// Save profile edits and fold the response into the stored user
pub async fn save_profile(
    api: &ApiClient,
    store: &SessionStore,
    form: &ProfileForm,
) -> Result<SessionUser, AuthError> {
    let submission = form.to_submission();
    let profile = api.update_profile(&submission).await?;

    let user = match store.user()? {
        Some(current) => current.merged_with(&profile, form.name.trim()),
        None => profile.into_session_user(),
    };
    store.update_user(&user, submission.phone_number.as_deref())?;
    Ok(user)
}

pub async fn change_password(api: &ApiClient, form: &PasswordForm) -> Result<(), AuthError> {
    let change = form.validate()?;
    api.change_password(&change).await?;
    info!("Password changed");
    Ok(())
}

/// Revoke every token server-side, then clear the local session even if
/// the backend call failed
pub async fn logout_everywhere(api: &ApiClient, store: &SessionStore) -> Result<(), AuthError> {
    let remote = api.logout_all().await;
    store.logout()?;
    if let Err(err) = &remote {
        warn!("Logout on other devices failed: {}", err);
    }
    remote.map_err(AuthError::from)
}

pub async fn delete_account(api: &ApiClient, store: &SessionStore) -> Result<(), AuthError> {
    api.delete_profile().await?;
    store.logout()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::SessionEvent;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn serve(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiClient::new(&format!("http://{addr}/api"), Duration::from_secs(5)).unwrap()
    }

    fn profile_route() -> Router {
        Router::new().route(
            "/api/profile",
            get(|headers: HeaderMap| async move {
                match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                    Some("Bearer magic-1") => (
                        StatusCode::OK,
                        Json(json!({"id": 3, "first_name": null, "last_name": null, "email": "bo@example.com"})),
                    ),
                    _ => (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid token."}))),
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_login_validation_runs_before_network() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        // Nothing is listening here
        let api = ApiClient::new("http://127.0.0.1:9/api", Duration::from_secs(1)).unwrap();

        let err = login(&api, &store, &LoginForm::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
        assert_eq!(err.user_message("x"), "Email and password are required.");
    }

    #[tokio::test]
    async fn test_signup_without_user_fetches_profile() {
        let router = profile_route().route(
            "/api/signup",
            post(|| async { Json(json!({"token": "magic-1"})) }),
        );
        let api = serve(router).await;
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        let mut listener = store.subscribe();

        let form = SignupForm {
            first_name: "Bo".into(),
            last_name: "Diaz".into(),
            email: "bo@example.com".into(),
            password: "password1".into(),
            ..Default::default()
        };
        let user = signup(&api, &store, &form).await.unwrap();

        assert_eq!(user.id, 3);
        assert_eq!(user.name, "bo@example.com");
        assert_eq!(store.token().unwrap().as_deref(), Some("magic-1"));
        assert_eq!(listener.poll(), Some(SessionEvent::LoggedIn));
        assert_eq!(listener.poll(), None);
    }

    #[tokio::test]
    async fn test_incomplete_signup_reports_summary() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        let api = ApiClient::new("http://127.0.0.1:9/api", Duration::from_secs(1)).unwrap();

        let err = signup(&api, &store, &SignupForm::default()).await.unwrap_err();
        match &err {
            AuthError::Incomplete(errors) => assert_eq!(errors.0.len(), 4),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.user_message("x"), "Please fill in all required fields.");
    }

    #[tokio::test]
    async fn test_magic_link() {
        let api = serve(profile_route()).await;
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();

        let missing = redeem_magic_link(&api, &store, Some("  ")).await.unwrap_err();
        assert_eq!(missing.user_message(MAGIC_LINK_FAILED), MAGIC_LINK_MISSING);

        let bad = redeem_magic_link(&api, &store, Some("stale")).await.unwrap_err();
        assert_eq!(bad.user_message(MAGIC_LINK_FAILED), "Invalid token.");
        assert!(!store.is_logged_in());

        let user = redeem_magic_link(&api, &store, Some("magic-1")).await.unwrap();
        assert_eq!(user.email, "bo@example.com");
        assert!(store.is_logged_in());
    }

    #[tokio::test]
    async fn test_profile_save_merges_and_remembers_phone() {
        let router = Router::new().route(
            "/api/profile",
            axum::routing::put(|| async {
                Json(json!({"id": 3, "email": "new@example.com", "phone_number": "787-555-0199"}))
            }),
        );
        let api = serve(router).await.with_token(Some("tok".into()));
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        let existing = SessionUser {
            id: 3,
            name: "Bo".into(),
            email: "bo@example.com".into(),
            photo: None,
            first_name: None,
            last_name: None,
            phone_number: None,
        };
        store.login(&existing, "tok").unwrap();
        let mut listener = store.subscribe();

        let form = ProfileForm {
            name: "Bo Diaz".into(),
            email: "new@example.com".into(),
            phone: "787-555-0199".into(),
            photo: None,
        };
        let user = save_profile(&api, &store, &form).await.unwrap();

        assert_eq!(user.name, "Bo Diaz");
        assert_eq!(user.email, "new@example.com");
        assert_eq!(listener.poll(), Some(SessionEvent::Updated));
        assert_eq!(listener.poll(), None);
        assert_eq!(store.remembered_phone().unwrap().as_deref(), Some("787-555-0199"));
    }

    #[tokio::test]
    async fn test_logout_everywhere_clears_even_on_failure() {
        let router = Router::new().route(
            "/api/logout/all",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops") }),
        );
        let api = serve(router).await.with_token(Some("tok".into()));
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        store
            .login(
                &SessionUser {
                    id: 1,
                    name: "A".into(),
                    email: "a@example.com".into(),
                    photo: None,
                    first_name: None,
                    last_name: None,
                    phone_number: None,
                },
                "tok",
            )
            .unwrap();

        let err = logout_everywhere(&api, &store).await.unwrap_err();
        assert_eq!(err.user_message("x"), "Something went wrong.");
        assert!(!store.is_logged_in());
        assert_eq!(store.token().unwrap(), None);
    }
}
