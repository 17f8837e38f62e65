use chrono::{DateTime, Utc};
use serde::Serialize;

use course_core::model::LessonId;

/// The next actionable lesson, with enough context to render a "continue
/// learning" link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextLesson {
    pub lesson_id: LessonId,
    pub title: String,
    pub module_title: String,
    pub order: u32,
}

/// Derived progress projection for one enrollment.
///
/// Everything here is recomputed on read; only the enrollment-level
/// completion timestamp is ever stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentSummary {
    pub percentage: u32,
    pub is_completed: bool,
    pub next_lesson: Option<NextLesson>,
    pub completed_count: u32,
    pub total_count: u32,
    pub time_spent_minutes: u32,
    pub estimated_completion_date: Option<DateTime<Utc>>,
}

/// A recently touched lesson for the enrollment detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentLesson {
    pub lesson_id: LessonId,
    pub title: String,
    pub completed: bool,
    pub last_accessed: DateTime<Utc>,
}
