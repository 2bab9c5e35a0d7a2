//! Records exchanged with the local cache and the remote backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reader::Position;

/// Outcome of a single store operation
///
/// Not-found is a normal answer (nothing stored yet) and is kept apart from
/// failures so callers choose explicitly whether to degrade or surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome<T> {
    /// The operation succeeded
    Success(T),
    /// Nothing is stored for the requested key
    NotFound,
    /// The store could not be reached or rejected the request
    Failure(String),
}

impl<T> StoreOutcome<T> {
    /// Whether this is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, StoreOutcome::Failure(_))
    }
}

/// A row of the remote `progress` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Owner of the record
    pub user_id: String,
    /// Course the progress belongs to
    pub course_id: String,
    /// Chapter index at the time of writing
    pub current_chapter: i64,
    /// Section index at the time of writing
    pub current_section: i64,
    /// Completion percentage (0-100)
    pub completed_percent: u8,
    /// When the record was written
    pub last_updated: DateTime<Utc>,
}

impl ProgressRecord {
    /// Build a record for a position reached now
    pub fn new(
        user_id: impl Into<String>,
        course_id: impl Into<String>,
        position: Position,
        completed_percent: u8,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            current_chapter: position.chapter_index as i64,
            current_section: position.section_index as i64,
            completed_percent: completed_percent.min(100),
            last_updated: Utc::now(),
        }
    }

    /// The `{chapter, section}` pair mirrored into the local cache
    pub fn snapshot(&self) -> LocalSnapshot {
        LocalSnapshot { chapter: self.current_chapter, section: self.current_section }
    }
}

/// The value stored under `progress-<user>` in the local cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    /// Chapter index
    pub chapter: i64,
    /// Section index
    pub section: i64,
}

impl LocalSnapshot {
    /// Parse the cached JSON string
    pub fn parse(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }

    /// Serialize for the cache
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A row of the remote `exam_results` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    /// Who took the exam
    #[serde(default)]
    pub user_id: String,
    /// Points scored
    pub score: f64,
    /// Points available
    pub max_score: f64,
}

impl ExamResult {
    /// Score as a percentage, `None` when the exam has no points available
    pub fn percent(&self) -> Option<f64> {
        (self.max_score > 0.0).then(|| self.score / self.max_score * 100.0)
    }
}

/// Rounded mean of per-exam percentages; 0 when there is nothing to average
pub fn average_exam_score(results: &[ExamResult]) -> u8 {
    let percents: Vec<f64> = results.iter().filter_map(ExamResult::percent).collect();
    if percents.is_empty() {
        return 0;
    }
    let mean = percents.iter().sum::<f64>() / percents.len() as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn exam(score: f64, max_score: f64) -> ExamResult {
        ExamResult { user_id: "u-1".into(), score, max_score }
    }

    #[test]
    fn record_uses_remote_column_names() {
        let record = ProgressRecord::new("u-1", "usool", Position::new(1, 2), 60);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["user_id"], "u-1");
        assert_eq!(json["course_id"], "usool");
        assert_eq!(json["current_chapter"], 1);
        assert_eq!(json["current_section"], 2);
        assert_eq!(json["completed_percent"], 60);
        assert!(json["last_updated"].is_string());
    }

    #[test]
    fn record_parses_backend_row() {
        let row = r#"{
            "user_id": "u-1",
            "course_id": "usool",
            "current_chapter": 3,
            "current_section": 0,
            "completed_percent": 72,
            "last_updated": "2025-01-05T10:00:00.123456+00:00"
        }"#;
        let record: ProgressRecord = serde_json::from_str(row).unwrap();
        assert_eq!(record.snapshot(), LocalSnapshot { chapter: 3, section: 0 });
        assert_eq!(record.completed_percent, 72);
    }

    #[test]
    fn snapshot_matches_cache_format() {
        let snapshot = LocalSnapshot { chapter: 0, section: 2 };
        assert_eq!(snapshot.to_json().unwrap(), r#"{"chapter":0,"section":2}"#);
        assert_eq!(LocalSnapshot::parse(r#"{"chapter":0,"section":2}"#).unwrap(), snapshot);
        assert!(LocalSnapshot::parse("garbage").is_err());
    }

    #[test]
    fn average_of_exam_percentages() {
        let results = vec![exam(8.0, 10.0), exam(15.0, 20.0), exam(1.0, 3.0)];
        // (80 + 75 + 33.33) / 3 = 62.78
        assert_eq!(average_exam_score(&results), 63);
    }

    #[test]
    fn average_skips_exams_without_points() {
        assert_eq!(average_exam_score(&[]), 0);
        assert_eq!(average_exam_score(&[exam(0.0, 0.0)]), 0);
        assert_eq!(average_exam_score(&[exam(5.0, 0.0), exam(9.0, 10.0)]), 90);
    }

    #[test]
    fn only_failures_report_failure() {
        assert!(!StoreOutcome::Success(3).is_failure());
        assert!(!StoreOutcome::<i32>::NotFound.is_failure());
        assert!(StoreOutcome::<()>::Failure("offline".into()).is_failure());
    }
}
