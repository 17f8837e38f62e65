use chrono::{DateTime, Utc};

use crate::model::ids::{CourseId, EnrollmentId, StudentId};

/// A student's registration in a course.
///
/// Completion is a rollup over the enrollment's progress records, not a
/// lifecycle state of its own: `completed_at` is set on the first transition
/// into "all lessons complete" and cleared again if any lesson is reset. An
/// unenrolled record stays around (inactive) for history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    id: EnrollmentId,
    student_id: StudentId,
    course_id: CourseId,
    enrolled_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    active: bool,
}

impl Enrollment {
    /// Creates a fresh, active, incomplete enrollment.
    #[must_use]
    pub fn new(
        id: EnrollmentId,
        student_id: StudentId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            course_id,
            enrolled_at,
            completed_at: None,
            active: true,
        }
    }

    /// Rebuilds an enrollment from its persisted state.
    #[must_use]
    pub fn from_persisted(
        id: EnrollmentId,
        student_id: StudentId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        active: bool,
    ) -> Self {
        Self {
            id,
            student_id,
            course_id,
            enrolled_at,
            completed_at,
            active,
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> EnrollmentId {
        self.id
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Records the rollup completion timestamp. Set once: a later call on an
    /// already-completed enrollment keeps the original timestamp.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    /// Clears the rollup after a lesson reset made the enrollment incomplete.
    pub fn clear_completed(&mut self) {
        self.completed_at = None;
    }

    /// Marks the enrollment inactive. Progress records are retained.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn build() -> Enrollment {
        Enrollment::new(
            EnrollmentId::new(1),
            StudentId::new(10),
            CourseId::new(20),
            fixed_now(),
        )
    }

    #[test]
    fn new_enrollment_is_active_and_incomplete() {
        let e = build();
        assert!(e.is_active());
        assert!(!e.is_completed());
        assert_eq!(e.completed_at(), None);
    }

    #[test]
    fn mark_completed_is_set_once() {
        let mut e = build();
        let first = fixed_now() + Duration::days(1);
        e.mark_completed(first);
        e.mark_completed(first + Duration::days(5));
        assert_eq!(e.completed_at(), Some(first));
    }

    #[test]
    fn clear_completed_reopens() {
        let mut e = build();
        e.mark_completed(fixed_now());
        e.clear_completed();
        assert!(!e.is_completed());

        // A later completion records a fresh timestamp.
        let later = fixed_now() + Duration::days(2);
        e.mark_completed(later);
        assert_eq!(e.completed_at(), Some(later));
    }

    #[test]
    fn deactivate_keeps_completion() {
        let mut e = build();
        e.mark_completed(fixed_now());
        e.deactivate();
        assert!(!e.is_active());
        assert!(e.is_completed());
    }
}
