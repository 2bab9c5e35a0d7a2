//! Content model for the curriculum
//!
//! A curriculum is a single classical text split into chapters, each holding
//! an ordered run of sections. The order is the reading order and is fixed
//! for the lifetime of a deployed curriculum version: stored positions are
//! plain indices into it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::CurriculumError;

/// A complete curriculum document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Curriculum {
    /// Display title of the text
    pub book_title: String,
    /// Chapters in reading order
    pub chapters: Vec<Chapter>,
}

impl Curriculum {
    /// Create a new curriculum with the given title and no chapters
    pub fn new(book_title: impl Into<String>) -> Self {
        Self { book_title: book_title.into(), chapters: Vec::new() }
    }

    /// Number of chapters
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Get total section count across all chapters
    pub fn section_count(&self) -> usize {
        self.chapters.iter().map(|c| c.sections.len()).sum()
    }

    /// Get a chapter by index
    pub fn chapter(&self, chapter_idx: usize) -> Option<&Chapter> {
        self.chapters.get(chapter_idx)
    }

    /// Get a section by chapter and section index
    pub fn get_section(&self, chapter_idx: usize, section_idx: usize) -> Option<&Section> {
        self.chapters.get(chapter_idx).and_then(|c| c.sections.get(section_idx))
    }

    /// Number of sections in a chapter (0 if the chapter does not exist)
    pub fn sections_in(&self, chapter_idx: usize) -> usize {
        self.chapters.get(chapter_idx).map(|c| c.sections.len()).unwrap_or(0)
    }

    /// Check the structural invariants every loaded curriculum must hold
    pub fn validate(&self) -> Result<(), CurriculumError> {
        if self.chapters.is_empty() {
            return Err(CurriculumError::NoChapters);
        }

        let mut chapter_ids = HashSet::new();
        for chapter in &self.chapters {
            if !chapter_ids.insert(chapter.id.as_str()) {
                return Err(CurriculumError::DuplicateChapter(chapter.id.clone()));
            }
            if chapter.sections.is_empty() {
                return Err(CurriculumError::EmptyChapter(chapter.id.clone()));
            }

            let mut section_ids = HashSet::new();
            for section in &chapter.sections {
                if !section_ids.insert(section.id.as_str()) {
                    return Err(CurriculumError::DuplicateSection {
                        chapter: chapter.id.clone(),
                        section: section.id.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// A chapter of the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Unique chapter identifier
    pub id: String,
    /// Chapter title
    pub title: String,
    /// Sections within this chapter
    pub sections: Vec<Section>,
}

impl Chapter {
    /// Create a new chapter without sections
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), sections: Vec::new() }
    }

    /// Index of the last section (chapters are never empty once validated)
    pub fn last_section_index(&self) -> usize {
        self.sections.len().saturating_sub(1)
    }
}

/// A section within a chapter: one passage of the text with its translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Identifier, unique within the chapter
    pub id: String,
    /// Original Arabic passage
    pub arabic: String,
    /// English translation
    pub english: String,
    /// Video explanation reference, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Key takeaways in display order
    #[serde(default)]
    pub takeaways: Vec<String>,
}

impl Section {
    /// Create a new section with no media or takeaways
    pub fn new(
        id: impl Into<String>,
        arabic: impl Into<String>,
        english: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            arabic: arabic.into(),
            english: english.into(),
            video_id: None,
            takeaways: Vec::new(),
        }
    }

    /// Attach a video reference
    pub fn with_video(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    /// Attach a takeaway
    pub fn with_takeaway(mut self, takeaway: impl Into<String>) -> Self {
        self.takeaways.push(takeaway.into());
        self
    }

    /// Full link to the video explanation
    pub fn video_url(&self) -> Option<String> {
        self.video_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://www.youtube.com/watch?v={}", id))
    }
}
