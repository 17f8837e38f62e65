use course_core::model::{Enrollment, StudentId};

/// Identity handed to services by the outer layer.
///
/// Authentication happens elsewhere; the capability flag is trusted as-is.
/// Services only decide whether a given call is permitted for this identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    student_id: StudentId,
    is_student: bool,
}

impl Caller {
    #[must_use]
    pub fn new(student_id: StudentId, is_student: bool) -> Self {
        Self {
            student_id,
            is_student,
        }
    }

    /// A caller with student capability.
    #[must_use]
    pub fn student(student_id: StudentId) -> Self {
        Self::new(student_id, true)
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.is_student
    }

    /// True when the enrollment belongs to this caller.
    #[must_use]
    pub fn owns(&self, enrollment: &Enrollment) -> bool {
        enrollment.student_id() == self.student_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CourseId, EnrollmentId};
    use course_core::time::fixed_now;

    #[test]
    fn ownership_follows_student_id() {
        let enrollment = Enrollment::new(
            EnrollmentId::new(1),
            StudentId::new(10),
            CourseId::new(20),
            fixed_now(),
        );
        assert!(Caller::student(StudentId::new(10)).owns(&enrollment));
        assert!(!Caller::student(StudentId::new(11)).owns(&enrollment));
    }
}
