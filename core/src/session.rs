use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_LUNCH_REMINDER: &str = "12:00";
const DEFAULT_DINNER_REMINDER: &str = "19:00";

/// Application context kept outside the entity store: who is logged in and
/// the UI preferences that go with the install rather than with a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// `None` follows the system preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(default = "default_lunch")]
    pub lunch_reminder: String,
    #[serde(default = "default_dinner")]
    pub dinner_reminder: String,
}

fn default_lunch() -> String {
    DEFAULT_LUNCH_REMINDER.to_string()
}

fn default_dinner() -> String {
    DEFAULT_DINNER_REMINDER.to_string()
}

impl Default for Session {
    fn default() -> Self {
        Self {
            current_user_id: None,
            theme: None,
            dark_mode: None,
            notifications_enabled: false,
            lunch_reminder: default_lunch(),
            dinner_reminder: default_dinner(),
        }
    }
}

/// File holding a [`Session`] as JSON.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the session. A missing file is a fresh session; an unreadable one
    /// is logged and also treated as fresh so startup never fails on it.
    pub fn load(&self) -> Session {
        match self.try_load() {
            Ok(session) => session,
            Err(e) => {
                warn!(path = %self.path.display(), error = %format!("{e:#}"), "ignoring unreadable session file");
                Session::default()
            }
        }
    }

    fn try_load(&self) -> Result<Session> {
        if !self.path.exists() {
            return Ok(Session::default());
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session: {}", self.path.display()))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let text = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("Failed to write session: {}", self.path.display()))
    }
}
