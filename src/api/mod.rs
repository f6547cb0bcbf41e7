//! REST client for the marketplace backend.

mod error;
mod upload;

pub use error::{backend_message, ApiError, GENERIC_BACKEND_MESSAGE};

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::forms::{
    LoginRequest, PasswordChange, ProfileSubmission, ProviderSubmission, ReviewSubmission,
    SignupSubmission, SubmitMode,
};
use crate::models::{AuthResponse, Category, Profile, Provider, Subcategory};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Swap the bearer token after the session changes
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Base URL without its trailing `/api` segment
    pub fn origin(&self) -> &str {
        self.base_url.strip_suffix("/api").unwrap_or(&self.base_url)
    }

    /// Absolute URL for a stored photo reference
    pub fn photo_url(&self, path: &str) -> Option<String> {
        if path.is_empty() {
            return None;
        }
        if path.starts_with("http") {
            return Some(path.to_string());
        }
        let separator = if path.starts_with('/') { "" } else { "/" };
        Some(format!("{}{}{}", self.origin(), separator, path))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    fn authed(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        if self.token.is_none() {
            return Err(ApiError::Unauthenticated);
        }
        Ok(self.request(method, path))
    }

    async fn checked(req: RequestBuilder) -> ApiResult<Response> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message =
            backend_message(&body).unwrap_or_else(|| GENERIC_BACKEND_MESSAGE.to_string());
        warn!("Backend returned {}: {}", status, message);
        Err(ApiError::Backend { status, message })
    }

    async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> ApiResult<T> {
        let response = Self::checked(req).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(req: RequestBuilder) -> ApiResult<()> {
        Self::checked(req).await?;
        Ok(())
    }

    // Directory

    pub async fn list_providers(&self) -> ApiResult<Vec<Provider>> {
        debug!("Fetching providers");
        Self::send_json(self.request(Method::GET, "/providers")).await
    }

    pub async fn get_provider(&self, id: i64) -> ApiResult<Provider> {
        debug!("Fetching provider {}", id);
        Self::send_json(self.request(Method::GET, &format!("/providers/{id}"))).await
    }

    pub async fn list_categories(&self) -> ApiResult<Vec<Category>> {
        Self::send_json(self.request(Method::GET, "/categories")).await
    }

    pub async fn list_subcategories(&self) -> ApiResult<Vec<Subcategory>> {
        Self::send_json(self.request(Method::GET, "/subcategories")).await
    }

    /// Providers and categories fetched together; either failing fails both
    pub async fn load_directory(&self) -> ApiResult<(Vec<Provider>, Vec<Category>)> {
        let (providers, categories) =
            tokio::try_join!(self.list_providers(), self.list_categories())?;
        info!(
            "Loaded {} providers and {} categories",
            providers.len(),
            categories.len()
        );
        Ok((providers, categories))
    }

    /// Listing plus the category catalogue for the edit form
    pub async fn load_provider_for_edit(&self, id: i64) -> ApiResult<(Provider, Vec<Category>)> {
        tokio::try_join!(self.get_provider(id), self.list_categories())
    }

    // Listings

    async fn provider_form(submission: &ProviderSubmission) -> ApiResult<reqwest::multipart::Form> {
        let mut form = upload::text_form(submission.text_fields());
        for path in &submission.photos {
            form = form.part("photos[]", upload::file_part(path).await?);
        }
        Ok(form)
    }

    /// The response body is not used; listings are re-fetched afterwards
    pub async fn create_provider(&self, submission: &ProviderSubmission) -> ApiResult<()> {
        info!("Submitting new listing {}", submission.company_name);
        let form = Self::provider_form(submission).await?;
        Self::send_empty(self.authed(Method::POST, "/providers")?.multipart(form)).await
    }

    /// Updates go out as POST with a `_method=PUT` override so files can ride along
    pub async fn update_provider(&self, id: i64, submission: &ProviderSubmission) -> ApiResult<()> {
        info!("Updating listing {}", id);
        debug_assert_eq!(submission.mode, SubmitMode::Edit);
        let form = Self::provider_form(submission).await?;
        Self::send_empty(
            self.authed(Method::POST, &format!("/providers/{id}"))?
                .multipart(form),
        )
        .await
    }

    pub async fn delete_provider(&self, id: i64) -> ApiResult<()> {
        info!("Deleting listing {}", id);
        Self::send_empty(self.authed(Method::DELETE, &format!("/providers/{id}"))?).await
    }

    // Bookmarks and reviews

    pub async fn list_bookmarks(&self) -> ApiResult<Vec<Provider>> {
        Self::send_json(self.authed(Method::GET, "/bookmarks")?).await
    }

    pub async fn is_bookmarked(&self, provider_id: i64) -> ApiResult<bool> {
        let bookmarks = self.list_bookmarks().await?;
        Ok(bookmarks.iter().any(|p| p.id == provider_id))
    }

    pub async fn add_bookmark(&self, provider_id: i64) -> ApiResult<()> {
        Self::send_empty(self.authed(Method::POST, &format!("/bookmarks/{provider_id}"))?).await
    }

    pub async fn remove_bookmark(&self, provider_id: i64) -> ApiResult<()> {
        Self::send_empty(self.authed(Method::DELETE, &format!("/bookmarks/{provider_id}"))?).await
    }

    /// Flip a bookmark; returns the new state
    pub async fn toggle_bookmark(&self, provider_id: i64, bookmarked: bool) -> ApiResult<bool> {
        if bookmarked {
            self.remove_bookmark(provider_id).await?;
        } else {
            self.add_bookmark(provider_id).await?;
        }
        Ok(!bookmarked)
    }

    pub async fn create_review(&self, provider_id: i64, review: &ReviewSubmission) -> ApiResult<()> {
        info!("Posting {}-star review for provider {}", review.rating, provider_id);
        Self::send_empty(
            self.authed(Method::POST, &format!("/providers/{provider_id}/reviews"))?
                .json(review),
        )
        .await
    }

    // Account

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse> {
        info!("Logging in {}", request.email);
        Self::send_json(self.request(Method::POST, "/login").json(request)).await
    }

    pub async fn signup(&self, submission: &SignupSubmission) -> ApiResult<AuthResponse> {
        info!("Creating account for {}", submission.email);
        let mut form = upload::text_form(submission.text_fields());
        if let Some(photo) = &submission.photo {
            form = form.part("photo", upload::file_part(photo).await?);
        }
        Self::send_json(self.request(Method::POST, "/signup").multipart(form)).await
    }

    pub async fn get_profile(&self) -> ApiResult<Profile> {
        Self::send_json(self.authed(Method::GET, "/profile")?).await
    }

    pub async fn update_profile(&self, submission: &ProfileSubmission) -> ApiResult<Profile> {
        let mut form = upload::text_form(submission.text_fields());
        if let Some(photo) = &submission.photo {
            form = form.part("photo", upload::file_part(photo).await?);
        }
        Self::send_json(self.authed(Method::PUT, "/profile")?.multipart(form)).await
    }

    pub async fn delete_profile(&self) -> ApiResult<()> {
        info!("Deleting account");
        Self::send_empty(self.authed(Method::DELETE, "/profile")?).await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> ApiResult<()> {
        Self::send_empty(self.authed(Method::POST, "/password/change")?.json(change)).await
    }

    pub async fn logout_all(&self) -> ApiResult<()> {
        Self::send_empty(self.authed(Method::POST, "/logout/all")?).await
    }
}
