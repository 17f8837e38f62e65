use std::collections::HashMap;
use std::sync::Arc;

use course_core::model::{Enrollment, EnrollmentId, LessonId, ModuleId, ProgressRecord};
use course_core::progress::ProgressSnapshot;
use storage::repository::{CatalogRepository, EnrollmentRepository, ProgressRepository};

use crate::Clock;
use crate::caller::Caller;
use crate::error::ProgressError;
use crate::summary::{EnrollmentSummary, NextLesson, RecentLesson};

/// Ledger mutations and the derived summary projection for one enrollment.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
            progress,
        }
    }

    async fn owned_enrollment(
        &self,
        caller: &Caller,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, ProgressError> {
        let enrollment = self
            .enrollments
            .get_enrollment(enrollment_id)
            .await?
            .ok_or(ProgressError::NotFound)?;
        if !caller.owns(&enrollment) {
            return Err(ProgressError::PermissionDenied);
        }
        Ok(enrollment)
    }

    /// Mark a lesson complete.
    ///
    /// Idempotent: completing an already-completed lesson refreshes
    /// `last_accessed` and keeps the original completion timestamp. The
    /// enrollment rollup is recomputed in the same transaction as the write.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` when the enrollment does not exist
    /// or the lesson is not part of its ledger, `PermissionDenied` when the
    /// caller does not own the enrollment.
    pub async fn mark_lesson_complete(
        &self,
        caller: &Caller,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<ProgressRecord, ProgressError> {
        self.owned_enrollment(caller, enrollment_id).await?;

        let mut record = self
            .progress
            .get_record(enrollment_id, lesson_id)
            .await?
            .ok_or(ProgressError::NotFound)?;
        let now = self.clock.now();
        let transitioned = record.mark_complete(now);
        let rollup = self.progress.apply_progress(&record, now).await?;
        if transitioned {
            tracing::debug!(
                enrollment_id = %enrollment_id,
                lesson_id = %lesson_id,
                enrollment_complete = rollup.completed_at.is_some(),
                "lesson completed"
            );
        }
        Ok(record)
    }

    /// Reset a lesson back to incomplete.
    ///
    /// Idempotent: resetting an already-incomplete lesson only refreshes
    /// `last_accessed`. Clears the enrollment rollup when it was set.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` when the enrollment does not exist
    /// or the lesson is not part of its ledger, `PermissionDenied` when the
    /// caller does not own the enrollment.
    pub async fn reset_lesson(
        &self,
        caller: &Caller,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<ProgressRecord, ProgressError> {
        self.owned_enrollment(caller, enrollment_id).await?;

        let mut record = self
            .progress
            .get_record(enrollment_id, lesson_id)
            .await?
            .ok_or(ProgressError::NotFound)?;
        let now = self.clock.now();
        record.reset(now);
        self.progress.apply_progress(&record, now).await?;
        Ok(record)
    }

    /// The full derived-progress projection for one enrollment.
    ///
    /// Certificate eligibility is `is_completed`; there is no separate
    /// issuance state.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` when the enrollment does not exist,
    /// `PermissionDenied` when the caller does not own it.
    pub async fn summary(
        &self,
        caller: &Caller,
        enrollment_id: EnrollmentId,
    ) -> Result<EnrollmentSummary, ProgressError> {
        let enrollment = self.owned_enrollment(caller, enrollment_id).await?;

        let lessons = self.catalog.lessons_of(enrollment.course_id()).await?;
        let records = self.progress.records_for_enrollment(enrollment_id).await?;
        let modules = self.catalog.modules_of(enrollment.course_id()).await?;
        let module_titles: HashMap<ModuleId, &str> = modules
            .iter()
            .map(|m| (m.id(), m.title()))
            .collect();

        let snapshot = ProgressSnapshot::new(&lessons, &records);
        let next_lesson = snapshot.next_lesson().map(|lesson| NextLesson {
            lesson_id: lesson.id(),
            title: lesson.title().to_owned(),
            module_title: module_titles
                .get(&lesson.module_id())
                .map_or_else(String::new, |title| (*title).to_owned()),
            order: lesson.order(),
        });

        Ok(EnrollmentSummary {
            percentage: snapshot.percentage(),
            is_completed: snapshot.is_complete(),
            next_lesson,
            completed_count: snapshot.completed_count(),
            total_count: snapshot.total_count(),
            time_spent_minutes: snapshot.time_spent_minutes(),
            estimated_completion_date: snapshot
                .estimated_completion_date(enrollment.enrolled_at(), self.clock.now()),
        })
    }

    /// Most recently accessed lessons of an enrollment, newest first.
    ///
    /// Lessons the student never touched do not appear.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` when the enrollment does not exist,
    /// `PermissionDenied` when the caller does not own it.
    pub async fn recent_progress(
        &self,
        caller: &Caller,
        enrollment_id: EnrollmentId,
        limit: u32,
    ) -> Result<Vec<RecentLesson>, ProgressError> {
        let enrollment = self.owned_enrollment(caller, enrollment_id).await?;

        let lessons = self.catalog.lessons_of(enrollment.course_id()).await?;
        let titles: HashMap<LessonId, &str> =
            lessons.iter().map(|l| (l.id(), l.title())).collect();

        let records = self
            .progress
            .recent_for_enrollment(enrollment_id, limit)
            .await?;
        let recent = records
            .iter()
            .filter_map(|record| {
                let last_accessed = record.last_accessed()?;
                Some(RecentLesson {
                    lesson_id: record.lesson_id(),
                    title: titles
                        .get(&record.lesson_id())
                        .map_or_else(String::new, |title| (*title).to_owned()),
                    completed: record.is_completed(),
                    last_accessed,
                })
            })
            .collect();
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Duration, Utc};
    use course_core::model::{CourseLevel, CourseStatus, LessonContent, StudentId};
    use course_core::time::fixed_now;
    use storage::repository::{
        InMemoryRepository, NewCourseRecord, NewEnrollmentRecord, NewLessonRecord, NewModuleRecord,
    };

    async fn seed_enrollment(repo: &InMemoryRepository) -> (EnrollmentId, Vec<LessonId>) {
        let course_id = repo
            .insert_course(NewCourseRecord {
                title: "Intro to Rust".into(),
                slug: "intro-to-rust".into(),
                description: None,
                level: CourseLevel::Beginner,
                status: CourseStatus::Published,
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
        let mut lesson_ids = Vec::new();
        for order in 1..=4 {
            let id = repo
                .insert_lesson(NewLessonRecord {
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
            lesson_ids.push(id);
        }
        let enrollment_id = repo
            .insert_enrollment(
                NewEnrollmentRecord {
                    student_id: StudentId::new(1),
                    course_id,
                    enrolled_at: fixed_now(),
                },
                &lesson_ids,
            )
            .await
            .unwrap();
        (enrollment_id, lesson_ids)
    }

    fn service_at(repo: &InMemoryRepository, at: DateTime<Utc>) -> ProgressService {
        ProgressService::new(
            Clock::Fixed(at),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn four_lesson_walkthrough() {
        let repo = InMemoryRepository::new();
        let (enrollment_id, lesson_ids) = seed_enrollment(&repo).await;
        let service = service_at(&repo, fixed_now());
        let caller = Caller::student(StudentId::new(1));

        let summary = service.summary(&caller, enrollment_id).await.unwrap();
        assert_eq!(summary.percentage, 0);
        assert_eq!(summary.next_lesson.as_ref().unwrap().order, 1);
        assert_eq!(summary.next_lesson.as_ref().unwrap().module_title, "Basics");
        assert_eq!(summary.estimated_completion_date, None);

        for lesson_id in &lesson_ids[..2] {
            service
                .mark_lesson_complete(&caller, enrollment_id, *lesson_id)
                .await
                .unwrap();
        }
        let summary = service.summary(&caller, enrollment_id).await.unwrap();
        assert_eq!(summary.percentage, 50);
        assert!(!summary.is_completed);
        assert_eq!(summary.next_lesson.as_ref().unwrap().order, 3);
        assert_eq!(summary.time_spent_minutes, 20);

        for lesson_id in &lesson_ids[2..] {
            service
                .mark_lesson_complete(&caller, enrollment_id, *lesson_id)
                .await
                .unwrap();
        }
        let summary = service.summary(&caller, enrollment_id).await.unwrap();
        assert_eq!(summary.percentage, 100);
        assert!(summary.is_completed);
        assert!(summary.next_lesson.is_none());
        assert_eq!(summary.completed_count, 4);
        assert_eq!(summary.total_count, 4);
    }

    #[tokio::test]
    async fn mark_complete_is_idempotent() {
        let repo = InMemoryRepository::new();
        let (enrollment_id, lesson_ids) = seed_enrollment(&repo).await;
        let caller = Caller::student(StudentId::new(1));

        let first = service_at(&repo, fixed_now())
            .mark_lesson_complete(&caller, enrollment_id, lesson_ids[0])
            .await
            .unwrap();
        let second = service_at(&repo, fixed_now() + Duration::hours(1))
            .mark_lesson_complete(&caller, enrollment_id, lesson_ids[0])
            .await
            .unwrap();

        assert_eq!(second.completed_at(), first.completed_at());
        assert!(second.last_accessed() > first.last_accessed());
    }

    #[tokio::test]
    async fn reset_then_complete_records_a_new_timestamp() {
        let repo = InMemoryRepository::new();
        let (enrollment_id, lesson_ids) = seed_enrollment(&repo).await;
        let caller = Caller::student(StudentId::new(1));

        let first = service_at(&repo, fixed_now())
            .mark_lesson_complete(&caller, enrollment_id, lesson_ids[0])
            .await
            .unwrap();

        let reset = service_at(&repo, fixed_now() + Duration::hours(1))
            .reset_lesson(&caller, enrollment_id, lesson_ids[0])
            .await
            .unwrap();
        assert!(!reset.is_completed());
        assert_eq!(reset.completed_at(), None);

        let again = service_at(&repo, fixed_now() + Duration::hours(2))
            .mark_lesson_complete(&caller, enrollment_id, lesson_ids[0])
            .await
            .unwrap();
        assert!(again.is_completed());
        assert!(again.completed_at() > first.completed_at());
    }

    #[tokio::test]
    async fn rollup_flips_with_final_completion_and_reset() {
        let repo = InMemoryRepository::new();
        let (enrollment_id, lesson_ids) = seed_enrollment(&repo).await;
        let service = service_at(&repo, fixed_now());
        let caller = Caller::student(StudentId::new(1));

        for lesson_id in &lesson_ids {
            service
                .mark_lesson_complete(&caller, enrollment_id, *lesson_id)
                .await
                .unwrap();
        }
        let enrollment = repo.get_enrollment(enrollment_id).await.unwrap().unwrap();
        assert!(enrollment.is_completed());

        service
            .reset_lesson(&caller, enrollment_id, lesson_ids[1])
            .await
            .unwrap();
        let enrollment = repo.get_enrollment(enrollment_id).await.unwrap().unwrap();
        assert!(!enrollment.is_completed());

        let summary = service.summary(&caller, enrollment_id).await.unwrap();
        assert_eq!(summary.percentage, 75);
        assert_eq!(summary.next_lesson.unwrap().lesson_id, lesson_ids[1]);
    }

    #[tokio::test]
    async fn foreign_lesson_is_not_found() {
        let repo = InMemoryRepository::new();
        let (enrollment_id, _) = seed_enrollment(&repo).await;
        let service = service_at(&repo, fixed_now());
        let caller = Caller::student(StudentId::new(1));

        let err = service
            .mark_lesson_complete(&caller, enrollment_id, LessonId::new(999))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::NotFound));
    }

    #[tokio::test]
    async fn summary_is_owner_only() {
        let repo = InMemoryRepository::new();
        let (enrollment_id, _) = seed_enrollment(&repo).await;
        let service = service_at(&repo, fixed_now());

        let intruder = Caller::student(StudentId::new(2));
        let err = service.summary(&intruder, enrollment_id).await.unwrap_err();
        assert!(matches!(err, ProgressError::PermissionDenied));
    }

    #[tokio::test]
    async fn recent_progress_lists_touched_lessons_newest_first() {
        let repo = InMemoryRepository::new();
        let (enrollment_id, lesson_ids) = seed_enrollment(&repo).await;
        let caller = Caller::student(StudentId::new(1));

        service_at(&repo, fixed_now())
            .mark_lesson_complete(&caller, enrollment_id, lesson_ids[0])
            .await
            .unwrap();
        service_at(&repo, fixed_now() + Duration::hours(1))
            .mark_lesson_complete(&caller, enrollment_id, lesson_ids[2])
            .await
            .unwrap();

        let recent = service_at(&repo, fixed_now() + Duration::hours(2))
            .recent_progress(&caller, enrollment_id, 5)
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].lesson_id, lesson_ids[2]);
        assert_eq!(recent[0].title, "Lesson 3");
        assert!(recent[0].completed);
        assert_eq!(recent[1].lesson_id, lesson_ids[0]);
    }
}
