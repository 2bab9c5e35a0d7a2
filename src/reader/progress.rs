//! Completion percentage derived from a reading position
//!
//! The section just reached counts as completed, so opening the very first
//! section already reports a nonzero percentage. 100 is reported only at
//! the last section of the last chapter.

use crate::curriculum::Curriculum;

use super::cursor::{Position, RestorePolicy};

/// Total number of sections in the curriculum
pub fn total_sections(doc: &Curriculum) -> usize {
    doc.section_count()
}

/// Sections completed up to and including the one at `position`
pub fn completed_sections(position: Position, doc: &Curriculum) -> usize {
    let before: usize =
        doc.chapters.iter().take(position.chapter_index).map(|c| c.sections.len()).sum();
    before + position.section_index + 1
}

/// Overall completion percentage (0-100)
///
/// Rounded like round(100 * completed / total), except that anything short
/// of the last section is capped at 99: with plain rounding 199 of 200
/// sections would already read 100, and 100 must mean the last section.
pub fn percent(position: Position, doc: &Curriculum) -> u8 {
    rounded_percent(completed_sections(position, doc), total_sections(doc))
}

/// Completion percentage within the current chapter (0-100)
pub fn chapter_percent(position: Position, doc: &Curriculum) -> u8 {
    rounded_percent(position.section_index + 1, doc.sections_in(position.chapter_index))
}

/// Percentage for a raw stored `{chapter, section}` pair
pub fn percent_for_snapshot(
    chapter: i64,
    section: i64,
    doc: &Curriculum,
    policy: RestorePolicy,
) -> u8 {
    percent(Position::restore(doc, chapter, section, policy).position, doc)
}

/// round(100 * done / total), half rounding up. Anything short of `total`
/// stays at 99 or below so 100 always means finished.
fn rounded_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total) as u64;
    let total = total as u64;
    let rounded = (200 * done + total) / (2 * total);
    if done < total { rounded.min(99) as u8 } else { 100 }
}
