use chrono::{DateTime, Utc};

use crate::model::ids::{EnrollmentId, LessonId};

/// Completion state of one lesson for one enrollment.
///
/// Invariant: `completed` is true exactly when `completed_at` is set.
/// `from_persisted` normalizes rather than errors, since the storage schema
/// enforces the pairing with a CHECK constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    enrollment_id: EnrollmentId,
    lesson_id: LessonId,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    last_accessed: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Creates the incomplete record seeded at enrollment time.
    #[must_use]
    pub fn seeded(enrollment_id: EnrollmentId, lesson_id: LessonId) -> Self {
        Self {
            enrollment_id,
            lesson_id,
            completed: false,
            completed_at: None,
            last_accessed: None,
        }
    }

    /// Rebuilds a record from persisted columns.
    #[must_use]
    pub fn from_persisted(
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
        completed_at: Option<DateTime<Utc>>,
        last_accessed: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            enrollment_id,
            lesson_id,
            completed: completed_at.is_some(),
            completed_at,
            last_accessed,
        }
    }

    // Accessors
    #[must_use]
    pub fn enrollment_id(&self) -> EnrollmentId {
        self.enrollment_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn last_accessed(&self) -> Option<DateTime<Utc>> {
        self.last_accessed
    }

    /// Marks the lesson complete. Idempotent: completing an already-completed
    /// lesson keeps the original `completed_at` and only refreshes
    /// `last_accessed`. Returns true when the flag actually flipped.
    pub fn mark_complete(&mut self, now: DateTime<Utc>) -> bool {
        self.last_accessed = Some(now);
        if self.completed {
            return false;
        }
        self.completed = true;
        self.completed_at = Some(now);
        true
    }

    /// Resets the lesson to incomplete, clearing `completed_at`. Idempotent.
    /// Returns true when the flag actually flipped.
    pub fn reset(&mut self, now: DateTime<Utc>) -> bool {
        self.last_accessed = Some(now);
        if !self.completed {
            return false;
        }
        self.completed = false;
        self.completed_at = None;
        true
    }

    /// Records a non-completing access (opening the lesson).
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn build() -> ProgressRecord {
        ProgressRecord::seeded(EnrollmentId::new(1), LessonId::new(5))
    }

    #[test]
    fn seeded_record_is_incomplete() {
        let record = build();
        assert!(!record.is_completed());
        assert_eq!(record.completed_at(), None);
        assert_eq!(record.last_accessed(), None);
    }

    #[test]
    fn mark_complete_sets_timestamp_once() {
        let mut record = build();
        let first = fixed_now();
        assert!(record.mark_complete(first));

        let again = first + Duration::hours(1);
        assert!(!record.mark_complete(again));
        assert_eq!(record.completed_at(), Some(first));
        // last_accessed still moves on the no-op completion
        assert_eq!(record.last_accessed(), Some(again));
    }

    #[test]
    fn reset_then_complete_records_new_timestamp() {
        let mut record = build();
        let first = fixed_now();
        record.mark_complete(first);

        let mid = first + Duration::hours(2);
        assert!(record.reset(mid));
        assert!(!record.is_completed());
        assert_eq!(record.completed_at(), None);

        let second = first + Duration::hours(4);
        assert!(record.mark_complete(second));
        assert_eq!(record.completed_at(), Some(second));
        assert!(record.completed_at().unwrap() > first);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut record = build();
        assert!(!record.reset(fixed_now()));
        assert_eq!(record.last_accessed(), Some(fixed_now()));
    }

    #[test]
    fn from_persisted_derives_flag() {
        let complete = ProgressRecord::from_persisted(
            EnrollmentId::new(1),
            LessonId::new(2),
            Some(fixed_now()),
            Some(fixed_now()),
        );
        assert!(complete.is_completed());

        let incomplete =
            ProgressRecord::from_persisted(EnrollmentId::new(1), LessonId::new(2), None, None);
        assert!(!incomplete.is_completed());
    }
}
