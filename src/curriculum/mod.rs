//! Curriculum document handling

pub mod error;
pub mod model;
pub mod storage;

pub use error::CurriculumError;
pub use model::{Chapter, Curriculum, Section};

/// Build a curriculum whose chapters hold the given numbers of sections
#[cfg(test)]
pub(crate) fn sized(sizes: &[usize]) -> Curriculum {
    let mut doc = Curriculum::new("Test");
    for (c, &n) in sizes.iter().enumerate() {
        let mut chapter = Chapter::new(format!("ch{}", c), format!("Chapter {}", c + 1));
        for s in 0..n {
            chapter.sections.push(Section::new(format!("s{}", s), "", ""));
        }
        doc.chapters.push(chapter);
    }
    doc
}
