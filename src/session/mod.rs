//! Persisted login state and change notification.

pub mod auth;
mod storage;
mod store;

pub use store::{SessionListener, SessionStore};
