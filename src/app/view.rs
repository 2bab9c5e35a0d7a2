//! Plain-text rendering of reader screens

use std::fmt::Write;

use crate::curriculum::Curriculum;
use crate::reader::Position;
use crate::reader::progress;

/// Render the section at `position`
pub fn render_section(
    doc: &Curriculum,
    position: Position,
    show_translation: bool,
    width: usize,
) -> String {
    let (Some(chapter), Some(section)) =
        (doc.chapter(position.chapter_index), position.current_section(doc))
    else {
        return String::new();
    };

    let width = width.max(20);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} · Chapter {}/{} · Section {}/{}",
        chapter.title,
        position.chapter_index + 1,
        doc.chapter_count(),
        position.section_index + 1,
        chapter.sections.len()
    );
    let _ = writeln!(out, "{}", "─".repeat(width));
    let _ = writeln!(out, "{}", textwrap::fill(&section.arabic, width));

    if show_translation {
        out.push('\n');
        let _ = writeln!(out, "{}", textwrap::fill(&section.english, width));
    }

    if let Some(url) = section.video_url() {
        let _ = writeln!(out, "\nVideo: {}", url);
    }

    if !section.takeaways.is_empty() {
        let _ = writeln!(out, "\nKey takeaways:");
        let options = textwrap::Options::new(width).initial_indent("  • ").subsequent_indent("    ");
        for takeaway in &section.takeaways {
            let _ = writeln!(out, "{}", textwrap::fill(takeaway, &options));
        }
    }

    let _ = write!(out, "\n{}", progress_bar(progress::chapter_percent(position, doc), width));
    out
}

/// Render the table of contents, marking the current chapter
pub fn render_toc(doc: &Curriculum, position: Position) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", doc.book_title);
    for (idx, chapter) in doc.chapters.iter().enumerate() {
        let marker = if idx == position.chapter_index { "●" } else { "·" };
        let _ = writeln!(
            out,
            " {} {}. {} ({} sections)",
            marker,
            idx + 1,
            chapter.title,
            chapter.sections.len()
        );
    }
    out
}

/// One-line position and progress summary
pub fn render_status(doc: &Curriculum, position: Position, reader: &str) -> String {
    format!(
        "{} · chapter {}, section {} · {}% of {} ({} of {} sections)",
        reader,
        position.chapter_index + 1,
        position.section_index + 1,
        progress::percent(position, doc),
        doc.book_title,
        progress::completed_sections(position, doc),
        progress::total_sections(doc)
    )
}

/// Horizontal bar with a percentage label
fn progress_bar(percent: u8, width: usize) -> String {
    let label = format!(" {:>3}%", percent);
    let bar_width = width.saturating_sub(label.len()).max(10);
    let filled = bar_width * usize::from(percent.min(100)) / 100;
    format!("{}{}{}", "█".repeat(filled), "░".repeat(bar_width - filled), label)
}
