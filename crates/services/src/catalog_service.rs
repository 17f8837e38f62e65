use std::sync::Arc;

use serde::Serialize;

use course_core::model::{
    Course, CourseId, CourseLevel, CourseModule, CourseStatus, Lesson, LessonContent, LessonId,
    ModuleId,
};
use storage::repository::{
    CatalogRepository, EnrollmentRepository, NewCourseRecord, NewLessonRecord, NewModuleRecord,
    StorageError,
};

use crate::Clock;
use crate::error::CatalogServiceError;

/// Read-only counters shown next to a course in catalog listings.
///
/// All of these are derived on demand; nothing here is stored on the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CourseStats {
    pub total_modules: u32,
    pub total_lessons: u32,
    pub total_duration_minutes: u32,
    pub active_enrollments: u32,
}

/// Orchestrates content-graph authoring and catalog reads.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl CatalogService {
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

    /// Create a course in draft state and persist it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Course` for validation failures.
    /// Returns `CatalogServiceError::Storage` when the slug is already taken
    /// or persistence fails.
    pub async fn create_course(
        &self,
        title: String,
        slug: Option<String>,
        description: Option<String>,
        level: CourseLevel,
    ) -> Result<CourseId, CatalogServiceError> {
        let now = self.clock.now();
        let course = Course::new(
            CourseId::new(1),
            title,
            slug,
            description,
            level,
            CourseStatus::Draft,
            now,
        )?;
        let course_id = self
            .catalog
            .insert_course(NewCourseRecord::from_course(&course))
            .await?;
        tracing::info!(course_id = %course_id, slug = course.slug(), "course created");
        Ok(course_id)
    }

    /// Move a course into the published state so it accepts enrollments.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` when the course does not exist
    /// or persistence fails.
    pub async fn publish_course(&self, course_id: CourseId) -> Result<(), CatalogServiceError> {
        self.set_status(course_id, CourseStatus::Published).await
    }

    /// Archive a course. Existing enrollments keep working; new enrollments
    /// are refused.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` when the course does not exist
    /// or persistence fails.
    pub async fn archive_course(&self, course_id: CourseId) -> Result<(), CatalogServiceError> {
        self.set_status(course_id, CourseStatus::Archived).await
    }

    async fn set_status(
        &self,
        course_id: CourseId,
        status: CourseStatus,
    ) -> Result<(), CatalogServiceError> {
        let course = self
            .catalog
            .get_course(course_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        self.catalog.upsert_course(&course.with_status(status)).await?;
        tracing::info!(course_id = %course_id, status = status.as_str(), "course status changed");
        Ok(())
    }

    /// Append a module to a course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Module` for validation failures, and
    /// `CatalogServiceError::Storage` when the course is missing or the
    /// order collides with an existing module.
    pub async fn add_module(
        &self,
        course_id: CourseId,
        title: String,
        description: Option<String>,
        order: u32,
    ) -> Result<ModuleId, CatalogServiceError> {
        let module = CourseModule::new(ModuleId::new(1), course_id, title, description, order)?;
        let module_id = self
            .catalog
            .insert_module(NewModuleRecord::from_module(&module))
            .await?;
        Ok(module_id)
    }

    /// Append a lesson to a module.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Lesson` for validation failures, and
    /// `CatalogServiceError::Storage` when the module is missing or the
    /// order collides with an existing lesson.
    pub async fn add_lesson(
        &self,
        module_id: ModuleId,
        title: String,
        content: LessonContent,
        duration_minutes: u32,
        order: u32,
        free_preview: bool,
    ) -> Result<LessonId, CatalogServiceError> {
        let lesson = Lesson::new(
            LessonId::new(1),
            module_id,
            title,
            content,
            duration_minutes,
            order,
            free_preview,
        )?;
        let lesson_id = self
            .catalog
            .insert_lesson(NewLessonRecord::from_lesson(&lesson))
            .await?;
        Ok(lesson_id)
    }

    /// Fetch a course by id. Returns `Ok(None)` when the course does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_course(
        &self,
        course_id: CourseId,
    ) -> Result<Option<Course>, CatalogServiceError> {
        let course = self.catalog.get_course(course_id).await?;
        Ok(course)
    }

    /// Fetch a course by slug. Returns `Ok(None)` when no course carries it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_course_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Course>, CatalogServiceError> {
        let course = self.catalog.get_course_by_slug(slug).await?;
        Ok(course)
    }

    /// List published courses ordered by id, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_published(&self, limit: u32) -> Result<Vec<Course>, CatalogServiceError> {
        let courses = self.catalog.list_published_courses(limit).await?;
        Ok(courses)
    }

    /// Derived counters for one course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` when the course does not exist
    /// or repository access fails.
    pub async fn course_stats(
        &self,
        course_id: CourseId,
    ) -> Result<CourseStats, CatalogServiceError> {
        self.catalog
            .get_course(course_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let modules = self.catalog.modules_of(course_id).await?;
        let total_lessons = self.catalog.lesson_count(course_id).await?;
        let total_duration_minutes = self.catalog.total_duration_minutes(course_id).await?;
        let active_enrollments = self.enrollments.active_enrollment_count(course_id).await?;

        Ok(CourseStats {
            total_modules: u32::try_from(modules.len()).unwrap_or(u32::MAX),
            total_lessons,
            total_duration_minutes,
            active_enrollments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use course_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> CatalogService {
        CatalogService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn create_and_publish_roundtrip() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);

        let course_id = service
            .create_course("Intro to Rust".into(), None, None, CourseLevel::Beginner)
            .await
            .unwrap();
        let course = service.get_course(course_id).await.unwrap().unwrap();
        assert!(!course.is_published());
        assert_eq!(course.slug(), "intro-to-rust");

        service.publish_course(course_id).await.unwrap();
        let course = service.get_course(course_id).await.unwrap().unwrap();
        assert!(course.is_published());

        let listed = service.list_published(10).await.unwrap();
        assert_eq!(listed.len(), 1);

        let by_slug = service
            .get_course_by_slug("intro-to-rust")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_slug.id(), course_id);
    }

    #[tokio::test]
    async fn stats_derive_from_content_graph() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);

        let course_id = service
            .create_course("Intro to Rust".into(), None, None, CourseLevel::Beginner)
            .await
            .unwrap();
        let module_id = service
            .add_module(course_id, "Basics".into(), None, 1)
            .await
            .unwrap();
        for order in 1..=2 {
            service
                .add_lesson(
                    module_id,
                    format!("Lesson {order}"),
                    LessonContent::Article {
                        body: "body".into(),
                    },
                    15,
                    order,
                    false,
                )
                .await
                .unwrap();
        }

        let stats = service.course_stats(course_id).await.unwrap();
        assert_eq!(stats.total_modules, 1);
        assert_eq!(stats.total_lessons, 2);
        assert_eq!(stats.total_duration_minutes, 30);
        assert_eq!(stats.active_enrollments, 0);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_storage_conflict() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);

        service
            .create_course("Intro to Rust".into(), None, None, CourseLevel::Beginner)
            .await
            .unwrap();
        let err = service
            .create_course(
                "Different Title".into(),
                Some("intro-to-rust".into()),
                None,
                CourseLevel::Beginner,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Storage(StorageError::Conflict)
        ));
    }
}
