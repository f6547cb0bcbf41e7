mod category;
mod provider;
mod review;
mod user;

pub use category::{Category, Subcategory};
pub use provider::{Provider, ProviderStatus};
pub use review::Review;
pub use user::{AuthResponse, Profile, SessionUser};
