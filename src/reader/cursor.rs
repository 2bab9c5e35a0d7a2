//! Reading position within a curriculum
//!
//! A [`Position`] is a (chapter, section) index pair. Every operation here
//! takes a valid position and returns a valid one; navigation past either
//! end of the document is a no-op rather than an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curriculum::{Chapter, Curriculum, Section};

/// Errors from explicit navigation requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// Requested chapter does not exist
    #[error("Chapter {index} is out of range (curriculum has {count} chapters)")]
    ChapterOutOfRange {
        /// Requested chapter index
        index: usize,
        /// Number of chapters available
        count: usize,
    },
}

/// What to do with a stored position that no longer fits the curriculum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestorePolicy {
    /// Move to the nearest valid chapter, then the nearest valid section
    #[default]
    Clamp,
    /// Start over from the beginning
    Reset,
}

/// The learner's location in the curriculum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Index into `Curriculum::chapters`
    pub chapter_index: usize,
    /// Index into the chapter's sections
    pub section_index: usize,
}

/// Result of restoring a stored position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restored {
    /// The valid position to use
    pub position: Position,
    /// Whether the stored values had to be changed to fit the curriculum
    pub adjusted: bool,
}

impl Position {
    /// The first section of the first chapter
    pub const START: Position = Position { chapter_index: 0, section_index: 0 };

    /// Create a position without checking it against a curriculum
    pub const fn new(chapter_index: usize, section_index: usize) -> Self {
        Self { chapter_index, section_index }
    }

    /// Whether this position indexes an existing section of `doc`
    pub fn is_valid(&self, doc: &Curriculum) -> bool {
        doc.get_section(self.chapter_index, self.section_index).is_some()
    }

    /// Move to the next section, crossing into the next chapter when needed.
    /// At the final section this returns the position unchanged.
    pub fn advance(self, doc: &Curriculum) -> Self {
        if self.section_index + 1 < doc.sections_in(self.chapter_index) {
            Self::new(self.chapter_index, self.section_index + 1)
        } else if self.chapter_index + 1 < doc.chapter_count() {
            Self::new(self.chapter_index + 1, 0)
        } else {
            self
        }
    }

    /// Move to the previous section, landing on the last section of the
    /// previous chapter when needed. At the first section this is a no-op.
    pub fn retreat(self, doc: &Curriculum) -> Self {
        if self.section_index > 0 {
            Self::new(self.chapter_index, self.section_index - 1)
        } else if self.chapter_index > 0 {
            let prev = self.chapter_index - 1;
            Self::new(prev, doc.chapter(prev).map(Chapter::last_section_index).unwrap_or(0))
        } else {
            self
        }
    }

    /// Jump to the first section of a chapter
    pub fn jump_to_chapter(doc: &Curriculum, chapter_index: usize) -> Result<Self, NavigationError> {
        if chapter_index < doc.chapter_count() {
            Ok(Self::new(chapter_index, 0))
        } else {
            Err(NavigationError::ChapterOutOfRange {
                index: chapter_index,
                count: doc.chapter_count(),
            })
        }
    }

    /// Build a valid position from stored values that may be negative or
    /// past the end of a curriculum that has since changed
    pub fn restore(doc: &Curriculum, chapter: i64, section: i64, policy: RestorePolicy) -> Restored {
        let last_chapter = doc.chapter_count().saturating_sub(1);
        let in_range = chapter >= 0
            && section >= 0
            && (chapter as u64) <= last_chapter as u64
            && (section as u64) < doc.sections_in(chapter as usize) as u64;

        if in_range {
            return Restored {
                position: Self::new(chapter as usize, section as usize),
                adjusted: false,
            };
        }

        let position = match policy {
            RestorePolicy::Reset => Self::START,
            RestorePolicy::Clamp => {
                let chapter_index = (chapter.max(0) as u64).min(last_chapter as u64) as usize;
                let last_section = doc.sections_in(chapter_index).saturating_sub(1);
                let section_index = (section.max(0) as u64).min(last_section as u64) as usize;
                Self::new(chapter_index, section_index)
            }
        };

        tracing::warn!(
            "Stored position ({}, {}) is outside the curriculum, using ({}, {})",
            chapter,
            section,
            position.chapter_index,
            position.section_index
        );
        Restored { position, adjusted: true }
    }

    /// Whether this is the first section of the document
    pub fn is_start(&self) -> bool {
        *self == Self::START
    }

    /// Whether this is the last section of the document
    pub fn is_end(&self, doc: &Curriculum) -> bool {
        self.advance(doc) == *self
    }

    /// The section this position points at
    pub fn current_section<'a>(&self, doc: &'a Curriculum) -> Option<&'a Section> {
        doc.get_section(self.chapter_index, self.section_index)
    }
}
