//! Course dashboard: reading progress, exam average and badges

use futures_util::future::join;

use crate::config::session::SessionContext;
use crate::curriculum::Curriculum;
use crate::reader::RestorePolicy;
use crate::reader::progress::percent_for_snapshot;
use crate::sync::{LocalCache, LocalSnapshot, RemoteStore, StoreOutcome, record::average_exam_score};

/// Average exam score needed for the exam badge
const PASSING_SCORE: u8 = 70;

/// Achievements shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    /// Exam average at or above the passing score
    PassedExam,
    /// Finished reading the whole text
    Reader,
}

impl Badge {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Badge::PassedExam => "Passed Exam",
            Badge::Reader => "Reader",
        }
    }
}

/// Summary figures for one learner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Reading progress through the course (0-100)
    pub progress: u8,
    /// Courses read to the end
    pub completed_courses: u32,
    /// Rounded mean of exam percentages
    pub average_score: u8,
    /// Number of exams taken
    pub exams_taken: usize,
    /// Badges earned
    pub badges: Vec<Badge>,
}

impl DashboardStats {
    fn from_parts(progress: u8, average_score: u8, exams_taken: usize) -> Self {
        let mut badges = Vec::new();
        if average_score >= PASSING_SCORE {
            badges.push(Badge::PassedExam);
        }
        if progress >= 100 {
            badges.push(Badge::Reader);
        }

        Self {
            progress,
            completed_courses: u32::from(progress >= 100),
            average_score,
            exams_taken,
            badges,
        }
    }

    /// Label for the course action button
    pub fn course_action(&self) -> &'static str {
        if self.progress > 0 { "Continue" } else { "Start Course" }
    }
}

/// Gather dashboard figures. Remote progress wins over the local cache;
/// remote failures only cost the figures they would have supplied.
pub async fn load_dashboard(
    ctx: &SessionContext,
    doc: &Curriculum,
    remote: Option<&dyn RemoteStore>,
    local: &dyn LocalCache,
    policy: RestorePolicy,
) -> DashboardStats {
    let remote = if ctx.is_anonymous() { None } else { remote };

    let (remote_progress, exams) = match remote {
        Some(remote) => {
            let (progress, exams) = join(
                remote.fetch_progress(ctx.user_key(), &ctx.course_id),
                remote.fetch_exam_results(ctx.user_key()),
            )
            .await;
            (progress, exams)
        }
        None => (StoreOutcome::NotFound, StoreOutcome::Success(Vec::new())),
    };

    if let StoreOutcome::Failure(reason) = &remote_progress {
        tracing::warn!("Remote progress unavailable for dashboard: {}", reason);
    }

    let progress = match remote_progress {
        StoreOutcome::Success(record) => record.completed_percent.min(100),
        StoreOutcome::NotFound | StoreOutcome::Failure(_) => local
            .get(&ctx.local_cache_key())
            .and_then(|value| LocalSnapshot::parse(&value).ok())
            .map(|s| percent_for_snapshot(s.chapter, s.section, doc, policy))
            .unwrap_or(0),
    };

    let exams = match exams {
        StoreOutcome::Success(results) => results,
        StoreOutcome::NotFound => Vec::new(),
        StoreOutcome::Failure(reason) => {
            tracing::warn!("Exam results unavailable: {}", reason);
            Vec::new()
        }
    };

    DashboardStats::from_parts(progress, average_exam_score(&exams), exams.len())
}
