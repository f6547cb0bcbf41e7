use reqwest::StatusCode;
use std::path::PathBuf;

/// Fallback when a failed response carries no usable message
pub const GENERIC_BACKEND_MESSAGE: &str = "Something went wrong.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-2xx response; `message` is what the backend said, verbatim
    #[error("{message}")]
    Backend { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Could not read {}: {source}", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Please log in to continue.")]
    Unauthenticated,
}

impl ApiError {
    /// Text for the user: backend messages pass through, transport problems
    /// collapse into the action's generic retry message
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Backend { message, .. } => message.clone(),
            ApiError::Upload { .. } | ApiError::Unauthenticated => self.to_string(),
            ApiError::Network(_) | ApiError::Decode(_) => fallback.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            ApiError::Network(err) => err.status(),
            _ => None,
        }
    }
}

/// Pull the user-facing message out of an error body: `message`, then
/// `error`, then the `errors` object serialized as JSON
pub fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let text = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    text("message").or_else(|| text("error")).or_else(|| {
        value
            .get("errors")
            .filter(|errors| !errors.is_null())
            .map(|errors| errors.to_string())
    })
}
