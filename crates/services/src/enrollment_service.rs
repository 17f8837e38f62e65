use std::sync::Arc;

use course_core::model::{CourseId, Enrollment, EnrollmentId, Lesson};
use storage::repository::{
    CatalogRepository, EnrollmentRepository, NewEnrollmentRecord, StorageError,
};

use crate::Clock;
use crate::caller::Caller;
use crate::error::EnrollmentError;

/// Owns the enrollment lifecycle: creation with ledger seeding, unenroll,
/// and per-student listings.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
        }
    }

    /// Enroll the caller in a course.
    ///
    /// Creates the enrollment and seeds one incomplete progress record per
    /// lesson currently in the course, all-or-nothing. The lesson set is
    /// snapshotted at this instant; lessons added later are not reconciled.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::PermissionDenied` when the caller lacks
    /// student capability, `NotFound` when the course does not exist,
    /// `CourseNotPublished` when it is not published, and `AlreadyEnrolled`
    /// when an active enrollment for this (student, course) pair exists.
    pub async fn enroll(
        &self,
        caller: &Caller,
        course_id: CourseId,
    ) -> Result<Enrollment, EnrollmentError> {
        if !caller.is_student() {
            return Err(EnrollmentError::PermissionDenied);
        }

        let course = self
            .catalog
            .get_course(course_id)
            .await?
            .ok_or(EnrollmentError::NotFound)?;
        if !course.is_published() {
            return Err(EnrollmentError::CourseNotPublished);
        }

        if self
            .enrollments
            .find_active(caller.student_id(), course_id)
            .await?
            .is_some()
        {
            return Err(EnrollmentError::AlreadyEnrolled);
        }

        let lessons = self.catalog.lessons_of(course_id).await?;
        let lesson_ids: Vec<_> = lessons.iter().map(Lesson::id).collect();

        let now = self.clock.now();
        let enrollment_id = self
            .enrollments
            .insert_enrollment(
                NewEnrollmentRecord {
                    student_id: caller.student_id(),
                    course_id,
                    enrolled_at: now,
                },
                &lesson_ids,
            )
            .await
            .map_err(|err| match err {
                // Lost a race against a concurrent enroll for the same pair.
                StorageError::Conflict => EnrollmentError::AlreadyEnrolled,
                other => EnrollmentError::Storage(other),
            })?;

        let enrollment = self
            .enrollments
            .get_enrollment(enrollment_id)
            .await?
            .ok_or(EnrollmentError::NotFound)?;
        tracing::info!(
            enrollment_id = %enrollment_id,
            course_id = %course_id,
            lessons = lesson_ids.len(),
            "student enrolled"
        );
        Ok(enrollment)
    }

    /// Mark an enrollment inactive. Progress records are retained for
    /// history. Calling this on an already-inactive enrollment succeeds.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::NotFound` when the enrollment does not
    /// exist and `PermissionDenied` when the caller does not own it.
    pub async fn unenroll(
        &self,
        caller: &Caller,
        enrollment_id: EnrollmentId,
    ) -> Result<(), EnrollmentError> {
        let enrollment = self
            .enrollments
            .get_enrollment(enrollment_id)
            .await?
            .ok_or(EnrollmentError::NotFound)?;
        if !caller.owns(&enrollment) {
            return Err(EnrollmentError::PermissionDenied);
        }
        if !enrollment.is_active() {
            return Ok(());
        }

        self.enrollments.deactivate(enrollment_id).await?;
        tracing::info!(enrollment_id = %enrollment_id, "student unenrolled");
        Ok(())
    }

    /// Active enrollments of the caller, newest first.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::PermissionDenied` when the caller lacks
    /// student capability, `Storage` if repository access fails.
    pub async fn list_for_student(
        &self,
        caller: &Caller,
    ) -> Result<Vec<Enrollment>, EnrollmentError> {
        if !caller.is_student() {
            return Err(EnrollmentError::PermissionDenied);
        }
        let enrollments = self
            .enrollments
            .list_active_for_student(caller.student_id())
            .await?;
        Ok(enrollments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use course_core::model::{CourseLevel, CourseStatus, LessonContent, StudentId};
    use course_core::time::{fixed_clock, fixed_now};
    use storage::repository::{
        InMemoryRepository, NewCourseRecord, NewLessonRecord, NewModuleRecord, ProgressRepository,
    };

    async fn seed_course(repo: &InMemoryRepository, status: CourseStatus) -> CourseId {
        let course_id = repo
            .insert_course(NewCourseRecord {
                title: "Intro to Rust".into(),
                slug: "intro-to-rust".into(),
                description: None,
                level: CourseLevel::Beginner,
                status,
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let module_id = repo
            .insert_module(NewModuleRecord {
                course_id,
                title: "Basics".into(),
                description: None,
                order: 1,
            })
            .await
            .unwrap();
        for order in 1..=3 {
            repo.insert_lesson(NewLessonRecord {
                module_id,
                title: format!("Lesson {order}"),
                content: LessonContent::Article {
                    body: "body".into(),
                },
                duration_minutes: 10,
                order,
                free_preview: false,
            })
            .await
            .unwrap();
        }
        course_id
    }

    fn service(repo: &InMemoryRepository) -> EnrollmentService {
        EnrollmentService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn enroll_seeds_the_full_ledger() {
        let repo = InMemoryRepository::new();
        let course_id = seed_course(&repo, CourseStatus::Published).await;
        let service = service(&repo);
        let caller = Caller::student(StudentId::new(1));

        let enrollment = service.enroll(&caller, course_id).await.unwrap();
        assert!(enrollment.is_active());
        assert!(!enrollment.is_completed());

        let records = repo.records_for_enrollment(enrollment.id()).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.is_completed()));
    }

    #[tokio::test]
    async fn enroll_requires_student_capability() {
        let repo = InMemoryRepository::new();
        let course_id = seed_course(&repo, CourseStatus::Published).await;
        let service = service(&repo);

        let caller = Caller::new(StudentId::new(1), false);
        let err = service.enroll(&caller, course_id).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::PermissionDenied));
    }

    #[tokio::test]
    async fn enroll_refuses_unpublished_course() {
        let repo = InMemoryRepository::new();
        let course_id = seed_course(&repo, CourseStatus::Draft).await;
        let service = service(&repo);
        let caller = Caller::student(StudentId::new(1));

        let err = service.enroll(&caller, course_id).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::CourseNotPublished));
    }

    #[tokio::test]
    async fn enroll_refuses_missing_course() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let caller = Caller::student(StudentId::new(1));

        let err = service.enroll(&caller, CourseId::new(404)).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_active_enrollment_is_rejected() {
        let repo = InMemoryRepository::new();
        let course_id = seed_course(&repo, CourseStatus::Published).await;
        let service = service(&repo);
        let caller = Caller::student(StudentId::new(1));

        service.enroll(&caller, course_id).await.unwrap();
        let err = service.enroll(&caller, course_id).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::AlreadyEnrolled));
    }

    #[tokio::test]
    async fn unenroll_then_reenroll_creates_a_fresh_enrollment() {
        let repo = InMemoryRepository::new();
        let course_id = seed_course(&repo, CourseStatus::Published).await;
        let service = service(&repo);
        let caller = Caller::student(StudentId::new(1));

        let first = service.enroll(&caller, course_id).await.unwrap();
        service.unenroll(&caller, first.id()).await.unwrap();
        // idempotent on an already-inactive enrollment
        service.unenroll(&caller, first.id()).await.unwrap();

        let second = service.enroll(&caller, course_id).await.unwrap();
        assert_ne!(first.id(), second.id());

        let listed = service.list_for_student(&caller).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), second.id());
    }

    #[tokio::test]
    async fn unenroll_checks_ownership() {
        let repo = InMemoryRepository::new();
        let course_id = seed_course(&repo, CourseStatus::Published).await;
        let service = service(&repo);

        let owner = Caller::student(StudentId::new(1));
        let enrollment = service.enroll(&owner, course_id).await.unwrap();

        let intruder = Caller::student(StudentId::new(2));
        let err = service
            .unenroll(&intruder, enrollment.id())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::PermissionDenied));
    }
}
