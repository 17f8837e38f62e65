//! Pure derived-value computation over a content graph snapshot and the
//! progress ledger of one enrollment. Nothing here mutates state; callers
//! fetch the inputs and read the answers.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::model::{Lesson, LessonId, ProgressRecord};

/// Read-only view joining an enrollment's ledger with the canonical lesson
/// sequence of its course.
///
/// `lessons` must already be in canonical order (module order, then lesson
/// order). The denominator for all ratios is the ledger size, not the live
/// lesson count: lessons added to the course after enrollment have no record
/// and are ignored.
#[derive(Debug)]
pub struct ProgressSnapshot<'a> {
    lessons: &'a [Lesson],
    by_lesson: HashMap<LessonId, &'a ProgressRecord>,
    completed: u32,
    total: u32,
}

impl<'a> ProgressSnapshot<'a> {
    #[must_use]
    pub fn new(lessons: &'a [Lesson], records: &'a [ProgressRecord]) -> Self {
        let by_lesson: HashMap<LessonId, &ProgressRecord> =
            records.iter().map(|r| (r.lesson_id(), r)).collect();
        let completed = records.iter().filter(|r| r.is_completed()).count();

        Self {
            lessons,
            by_lesson,
            completed: u32::try_from(completed).unwrap_or(u32::MAX),
            total: u32::try_from(records.len()).unwrap_or(u32::MAX),
        }
    }

    /// Number of completed lessons in the ledger.
    #[must_use]
    pub fn completed_count(&self) -> u32 {
        self.completed
    }

    /// Ledger size: the lesson count at enrollment time.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total
    }

    /// Rounded completion percentage; 0 when the ledger is empty.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let ratio = f64::from(self.completed) * 100.0 / f64::from(self.total);
        // round half away from zero, matching round() semantics
        ratio.round() as u32
    }

    /// True when every ledger record is complete and the ledger is non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }

    /// First lesson in canonical order with an incomplete record. `None` when
    /// everything is complete or no lessons exist.
    #[must_use]
    pub fn next_lesson(&self) -> Option<&'a Lesson> {
        self.lessons.iter().find(|lesson| {
            self.by_lesson
                .get(&lesson.id())
                .is_some_and(|record| !record.is_completed())
        })
    }

    /// Minutes invested so far: the summed duration of completed lessons.
    /// Uncompleted lessons contribute nothing.
    #[must_use]
    pub fn time_spent_minutes(&self) -> u32 {
        self.lessons
            .iter()
            .filter(|lesson| {
                self.by_lesson
                    .get(&lesson.id())
                    .is_some_and(|record| record.is_completed())
            })
            .map(Lesson::duration_minutes)
            .sum()
    }

    /// Most recent `completed_at` across the ledger.
    #[must_use]
    pub fn latest_completed_at(&self) -> Option<DateTime<Utc>> {
        self.by_lesson
            .values()
            .filter_map(|record| record.completed_at())
            .max()
    }

    /// Extrapolates a completion date from the student's observed pace.
    ///
    /// Pace is the span from enrollment to the latest completion divided by
    /// the number of completed lessons; the estimate is `now + pace *
    /// remaining`. Returns `None` when nothing is complete yet (no pace
    /// signal) and the latest completion timestamp when nothing remains.
    #[must_use]
    pub fn estimated_completion_date(
        &self,
        enrolled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if self.completed == 0 {
            return None;
        }

        let latest = self.latest_completed_at()?;
        let remaining = self.total - self.completed;
        if remaining == 0 {
            return Some(latest);
        }

        let elapsed = (latest - enrolled_at).max(Duration::zero());
        let pace_secs = elapsed.num_seconds() / i64::from(self.completed);
        Some(now + Duration::seconds(pace_secs * i64::from(remaining)))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
