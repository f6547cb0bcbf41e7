use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info};

use super::storage::LocalStorage;
use crate::models::SessionUser;

const USER_KEY: &str = "user";
const TOKEN_KEY: &str = "token";
const PHONE_KEY: &str = "profile-phone";
const SAVED_AT_KEY: &str = "session-saved-at";

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Updated,
    LoggedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: SessionUser,
    pub token: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Typed owner of the persisted (user, token) pair.
///
/// Every mutation writes storage first and then emits one `SessionEvent`.
/// Listeners are expected to re-read the store when they see an event.
#[derive(Clone)]
pub struct SessionStore {
    storage: LocalStorage,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn open(dir: &Path) -> Result<Self> {
        let storage = LocalStorage::open(dir)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self { storage, events })
    }

    pub fn storage_dir(&self) -> &Path {
        self.storage.root()
    }

    pub fn subscribe(&self) -> SessionListener {
        SessionListener {
            rx: self.events.subscribe(),
        }
    }

    pub fn user(&self) -> Result<Option<SessionUser>> {
        self.storage.get_json(USER_KEY)
    }

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self.storage.get_item(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    pub fn current(&self) -> Result<Option<Session>> {
        let Some(user) = self.user()? else {
            return Ok(None);
        };
        let saved_at = self
            .storage
            .get_item(SAVED_AT_KEY)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|ts| ts.with_timezone(&Utc));

        Ok(Some(Session {
            user,
            token: self.token()?,
            saved_at,
        }))
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.user(), Ok(Some(_)))
    }

    pub fn remembered_phone(&self) -> Result<Option<String>> {
        self.storage.get_item(PHONE_KEY)
    }

    pub fn login(&self, user: &SessionUser, token: &str) -> Result<()> {
        self.storage.set_json(USER_KEY, user)?;
        self.storage.set_item(TOKEN_KEY, token)?;
        self.storage.set_item(SAVED_AT_KEY, &Utc::now().to_rfc3339())?;
        info!("Session started for user {}", user.id);
        self.notify(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Replace the stored user after a profile edit
    pub fn update_user(&self, user: &SessionUser, phone: Option<&str>) -> Result<()> {
        self.storage.set_json(USER_KEY, user)?;
        if let Some(phone) = phone {
            self.storage.set_item(PHONE_KEY, phone)?;
        }
        self.notify(SessionEvent::Updated);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.storage.remove_item(USER_KEY)?;
        self.storage.remove_item(TOKEN_KEY)?;
        self.storage.remove_item(SAVED_AT_KEY)?;
        info!("Session cleared");
        self.notify(SessionEvent::LoggedOut);
        Ok(())
    }

    fn notify(&self, event: SessionEvent) {
        debug!("Broadcasting session event {:?}", event);
        // No listeners is fine
        let _ = self.events.send(event);
    }
}

pub struct SessionListener {
    rx: broadcast::Receiver<SessionEvent>,
}

impl SessionListener {
    /// Next pending event without waiting
    pub fn poll(&mut self) -> Option<SessionEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("Session listener skipped {} events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain everything pending; true when at least one change arrived
    pub fn drain(&mut self) -> bool {
        let mut changed = false;
        while self.poll().is_some() {
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user(id: i64, name: &str) -> SessionUser {
        SessionUser {
            id,
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            photo: None,
            first_name: None,
            last_name: None,
            phone_number: None,
        }
    }

    #[test]
    fn test_login_persists_and_notifies_once() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        let mut navbar = store.subscribe();
        let mut profile_screen = store.subscribe();

        assert!(!store.is_logged_in());
        store.login(&user(7, "Ana"), "tok-1").unwrap();

        assert_eq!(navbar.poll(), Some(SessionEvent::LoggedIn));
        assert_eq!(navbar.poll(), None);
        assert_eq!(profile_screen.poll(), Some(SessionEvent::LoggedIn));
        assert_eq!(profile_screen.poll(), None);

        let session = store.current().unwrap().unwrap();
        assert_eq!(session.user.id, 7);
        assert_eq!(session.token.as_deref(), Some("tok-1"));
        assert!(session.saved_at.is_some());
    }

    #[test]
    fn test_logout_clears_both_values() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        store.login(&user(7, "Ana"), "tok-1").unwrap();

        let mut listener = store.subscribe();
        store.logout().unwrap();

        assert_eq!(listener.poll(), Some(SessionEvent::LoggedOut));
        assert_eq!(listener.poll(), None);
        assert_eq!(store.user().unwrap(), None);
        assert_eq!(store.token().unwrap(), None);
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_profile_update_is_seen_by_independent_store() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        store.login(&user(7, "Ana"), "tok-1").unwrap();

        let mut listener = store.subscribe();
        store.update_user(&user(7, "Ana Maria"), Some("787-555-0101")).unwrap();
        assert!(listener.drain());
        assert!(!listener.drain());

        let other_tab = SessionStore::open(dir.path()).unwrap();
        assert_eq!(other_tab.user().unwrap().unwrap().name, "Ana Maria");
        assert_eq!(other_tab.token().unwrap().as_deref(), Some("tok-1"));
        assert_eq!(other_tab.remembered_phone().unwrap().as_deref(), Some("787-555-0101"));
    }

    #[test]
    fn test_each_change_is_observed_in_order() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        let mut listener = store.subscribe();

        store.login(&user(1, "A"), "t").unwrap();
        store.update_user(&user(1, "B"), None).unwrap();
        store.logout().unwrap();

        assert_eq!(listener.poll(), Some(SessionEvent::LoggedIn));
        assert_eq!(listener.poll(), Some(SessionEvent::Updated));
        assert_eq!(listener.poll(), Some(SessionEvent::LoggedOut));
        assert_eq!(listener.poll(), None);
    }

    #[test]
    fn test_corrupt_user_reads_as_logged_out() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        store.login(&user(1, "A"), "t").unwrap();
        std::fs::write(dir.path().join("user.json"), "\"{broken\"").unwrap();

        assert!(!store.is_logged_in());
        assert_eq!(store.current().unwrap(), None);
    }
}
