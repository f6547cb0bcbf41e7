pub mod bookmarks;
pub mod components;
pub mod directory;
pub mod login;
pub mod my_services;
pub mod provider_detail;
pub mod provider_wizard;
pub mod settings;
pub mod signup;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};

/// Block for the next key press; other terminal events yield None
pub fn read_key() -> Result<Option<KeyCode>> {
    match event::read()? {
        Event::Key(key) if key.kind != KeyEventKind::Release => Ok(Some(key.code)),
        _ => Ok(None),
    }
}
