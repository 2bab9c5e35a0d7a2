//! Curriculum loading
//!
//! The curriculum is read once at startup and never changes while the
//! process runs. The default text ships inside the binary.

use std::fs;
use std::path::Path;

use super::error::CurriculumError;
use super::model::Curriculum;

/// The bundled text (Usool ath-Thalatha)
const BUNDLED_USOOL: &str = include_str!("../../data/usool.json");

impl Curriculum {
    /// Parse and validate a curriculum from a JSON string
    pub fn from_json(json: &str) -> Result<Self, CurriculumError> {
        let curriculum: Curriculum = serde_json::from_str(json)?;
        curriculum.validate()?;
        Ok(curriculum)
    }

    /// Load a curriculum from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self, CurriculumError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| CurriculumError::Io { path: path.to_path_buf(), source })?;
        let curriculum = Self::from_json(&contents)?;

        tracing::debug!(
            "Loaded curriculum '{}' from {:?} ({} chapters, {} sections)",
            curriculum.book_title,
            path,
            curriculum.chapter_count(),
            curriculum.section_count()
        );
        Ok(curriculum)
    }

    /// The curriculum bundled with the binary
    pub fn bundled() -> Result<Self, CurriculumError> {
        Self::from_json(BUNDLED_USOOL)
    }

    /// Load from `path` if given, otherwise fall back to the bundled text
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, CurriculumError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }
}
