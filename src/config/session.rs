//! Signed-in learner and the per-session context
//!
//! The current user is kept in `session.json` so the reader can resume
//! for the same person. Components never look the user up themselves:
//! they receive a [`SessionContext`] built once at startup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::Config;

/// User key used when nobody is signed in
pub const GUEST_ID: &str = "guest";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// A learner identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier, also the remote `user_id`
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
}

impl User {
    /// Create a user, generating an id when none is supplied
    pub fn new(id: Option<String>, name: &str, email: &str) -> Result<Self> {
        let name = name.trim();
        let email = email.trim();

        if name.is_empty() {
            bail!("Name must not be empty");
        }
        if !EMAIL_RE.is_match(email) {
            bail!("'{}' is not a valid email address", email);
        }

        let id = id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if id == GUEST_ID {
            bail!("'{}' is reserved for anonymous sessions", GUEST_ID);
        }

        Ok(Self { id, name: name.to_string(), email: email.to_lowercase() })
    }
}

/// Persisted session state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Currently signed-in user (if any)
    pub current_user: Option<User>,
}

impl Session {
    /// Load session from disk
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::session_path()?)
    }

    /// Load session from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read session from {:?}", path))?;
            serde_json::from_str(&contents).with_context(|| "Failed to parse session.json")
        } else {
            Ok(Self::default())
        }
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::session_path()?)
    }

    /// Save session to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize session")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write session to {:?}", path))?;

        Ok(())
    }

    /// Get the path to the session file
    fn session_path() -> Result<PathBuf> {
        Ok(Config::data_dir()?.join("session.json"))
    }

    /// Build the context handed to the reader and synchronizer
    pub fn context(&self, course_id: impl Into<String>) -> SessionContext {
        SessionContext { user: self.current_user.clone(), course_id: course_id.into() }
    }
}

/// Identity and course for one reading session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Signed-in user, `None` for an anonymous reader
    pub user: Option<User>,
    /// Course the progress belongs to
    pub course_id: String,
}

impl SessionContext {
    /// Context for an anonymous reader
    pub fn anonymous(course_id: impl Into<String>) -> Self {
        Self { user: None, course_id: course_id.into() }
    }

    /// Context for a signed-in user
    pub fn for_user(user: User, course_id: impl Into<String>) -> Self {
        Self { user: Some(user), course_id: course_id.into() }
    }

    /// Whether nobody is signed in
    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }

    /// The user id, or "guest"
    pub fn user_key(&self) -> &str {
        self.user.as_ref().map(|u| u.id.as_str()).unwrap_or(GUEST_ID)
    }

    /// Name to greet the reader with
    pub fn display_name(&self) -> &str {
        self.user.as_ref().map(|u| u.name.as_str()).unwrap_or("Guest Student")
    }

    /// Local cache key holding this user's position
    pub fn local_cache_key(&self) -> String {
        format!("progress-{}", self.user_key())
    }
}
