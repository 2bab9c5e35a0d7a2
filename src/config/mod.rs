//! Configuration management for IlmOS

pub mod session;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::reader::RestorePolicy;

/// Environment variable overriding the backend URL
pub const BACKEND_URL_ENV: &str = "ILMOS_BACKEND_URL";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the hosted backend (e.g. "https://xyz.supabase.co")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    /// Course the reading position is recorded against
    pub course_id: String,

    /// Quiet period before a position change is written (milliseconds)
    pub debounce_ms: u64,

    /// Write any pending position immediately when the reader exits
    pub flush_on_exit: bool,

    /// How to treat a stored position that no longer fits the curriculum
    pub restore_policy: RestorePolicy,

    /// Curriculum JSON to load instead of the bundled text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curriculum_path: Option<PathBuf>,

    /// Column width for wrapping reader text
    pub wrap_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            course_id: "usool".to_string(),
            debounce_ms: 1000,
            flush_on_exit: false,
            restore_policy: RestorePolicy::Clamp,
            curriculum_path: None,
            wrap_width: 80,
        }
    }
}

impl Config {
    /// Load configuration from disk, or create default if not exists
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, creating it if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;
            serde_json::from_str(&contents).with_context(|| "Failed to parse config.json")
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "ilmos").context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "ilmos").context("Failed to determine data directory")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Get the local progress cache path
    pub fn cache_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("cache.json"))
    }

    /// Backend URL, with the environment taking precedence over the file
    pub fn resolved_backend_url(&self) -> Option<String> {
        std::env::var(BACKEND_URL_ENV)
            .ok()
            .or_else(|| self.backend_url.clone())
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
    }

    /// Debounce delay as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_usool() {
        let config = Config::default();
        assert_eq!(config.course_id, "usool");
        assert_eq!(config.debounce(), Duration::from_secs(1));
    }

    #[test]
    fn default_config_does_not_flush_on_exit() {
        let config = Config::default();
        assert!(!config.flush_on_exit);
        assert_eq!(config.restore_policy, RestorePolicy::Clamp);
    }

    #[test]
    fn config_serializes_to_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("usool"));
        assert!(!json.contains("backend_url"));
    }

    #[test]
    fn config_deserializes_partial_json() {
        let json = r#"{"backend_url":"https://example.supabase.co/","debounce_ms":250,"restore_policy":"reset"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.restore_policy, RestorePolicy::Reset);
        assert_eq!(config.course_id, "usool");
        assert_eq!(config.backend_url.as_deref(), Some("https://example.supabase.co/"));
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let mut changed = config.clone();
        changed.flush_on_exit = true;
        changed.save_to(&path).unwrap();
        assert!(Config::load_from(&path).unwrap().flush_on_exit);
    }
}
