//! Remote record store interface

use async_trait::async_trait;

use super::record::{ExamResult, ProgressRecord, StoreOutcome};

/// The hosted backend holding per-user progress and exam results
///
/// Every operation reports through [`StoreOutcome`]; implementations never
/// panic or return transport errors directly.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the progress row for a user and course
    async fn fetch_progress(&self, user_id: &str, course_id: &str) -> StoreOutcome<ProgressRecord>;

    /// Insert or overwrite the progress row keyed by (user_id, course_id)
    async fn upsert_progress(&self, record: &ProgressRecord) -> StoreOutcome<()>;

    /// Fetch every exam result recorded for a user
    async fn fetch_exam_results(&self, user_id: &str) -> StoreOutcome<Vec<ExamResult>>;
}
