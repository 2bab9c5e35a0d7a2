//! Error types for curriculum loading

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or validating a curriculum
#[derive(Debug, Error)]
pub enum CurriculumError {
    /// The document has no chapters at all
    #[error("Curriculum has no chapters")]
    NoChapters,

    /// A chapter has no sections
    #[error("Chapter '{0}' has no sections")]
    EmptyChapter(String),

    /// Two chapters share an id
    #[error("Duplicate chapter id '{0}'")]
    DuplicateChapter(String),

    /// Two sections in one chapter share an id
    #[error("Duplicate section id '{section}' in chapter '{chapter}'")]
    DuplicateSection {
        /// Chapter holding the duplicate
        chapter: String,
        /// Repeated section id
        section: String,
    },

    /// Failed to read the curriculum file
    #[error("Failed to read curriculum from {path:?}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("Invalid curriculum JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
