//! Backend key management using the environment or system keyring

use keyring::Entry;

use super::error::SyncError;

/// Environment variable holding the backend key
pub const BACKEND_KEY_ENV: &str = "ILMOS_BACKEND_KEY";
/// Service name for keyring storage
const SERVICE_NAME: &str = "ilmos";
/// Entry name for the backend key
const BACKEND_KEY_ENTRY: &str = "backend-key";

/// Manages the backend's anonymous API key
pub struct BackendKeyManager;

impl BackendKeyManager {
    /// Get the key, preferring the environment over the keyring
    pub fn get_key() -> Result<String, SyncError> {
        if let Ok(key) = std::env::var(BACKEND_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }

        let entry = Entry::new(SERVICE_NAME, BACKEND_KEY_ENTRY)
            .map_err(|e| SyncError::KeyringError(e.to_string()))?;

        entry.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => SyncError::KeyNotFound,
            _ => SyncError::KeyringError(e.to_string()),
        })
    }

    /// Store the key in the system keyring
    pub fn set_key(key: &str) -> Result<(), SyncError> {
        let key = key.trim();
        if !Self::validate_key_format(key) {
            return Err(SyncError::InvalidKey);
        }

        let entry = Entry::new(SERVICE_NAME, BACKEND_KEY_ENTRY)
            .map_err(|e| SyncError::KeyringError(e.to_string()))?;

        entry.set_password(key).map_err(|e| SyncError::KeyringError(e.to_string()))
    }

    /// Delete the stored key
    pub fn delete_key() -> Result<(), SyncError> {
        let entry = Entry::new(SERVICE_NAME, BACKEND_KEY_ENTRY)
            .map_err(|e| SyncError::KeyringError(e.to_string()))?;

        entry.delete_credential().map_err(|e| SyncError::KeyringError(e.to_string()))
    }

    /// Validate key format: a three-part JWT or a publishable key
    fn validate_key_format(key: &str) -> bool {
        let is_jwt = key.starts_with("eyJ") && key.split('.').count() == 3;
        let is_publishable = key.starts_with("sb_publishable_") && key.len() > 20;
        is_jwt || is_publishable
    }

    /// Mask a key for display (show first 8 and last 4 chars)
    pub fn mask_key(key: &str) -> String {
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 12 {
            return "*".repeat(chars.len());
        }
        let prefix: String = chars[..8].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    }
}
