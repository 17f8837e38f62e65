use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use course_core::model::{
    Course, CourseId, CourseModule, Enrollment, EnrollmentId, Lesson, LessonContent, LessonId,
    ModuleId, ProgressRecord, StudentId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── INSERT RECORDS ────────────────────────────────────────────────────────────
//

/// Insert shape for a course; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewCourseRecord {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub level: course_core::model::CourseLevel,
    pub status: course_core::model::CourseStatus,
    pub created_at: DateTime<Utc>,
}

impl NewCourseRecord {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title().to_owned(),
            slug: course.slug().to_owned(),
            description: course.description().map(str::to_owned),
            level: course.level(),
            status: course.status(),
            created_at: course.created_at(),
        }
    }
}

/// Insert shape for a module; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewModuleRecord {
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub order: u32,
}

impl NewModuleRecord {
    #[must_use]
    pub fn from_module(module: &CourseModule) -> Self {
        Self {
            course_id: module.course_id(),
            title: module.title().to_owned(),
            description: module.description().map(str::to_owned),
            order: module.order(),
        }
    }
}

/// Insert shape for a lesson; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewLessonRecord {
    pub module_id: ModuleId,
    pub title: String,
    pub content: LessonContent,
    pub duration_minutes: u32,
    pub order: u32,
    pub free_preview: bool,
}

impl NewLessonRecord {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            module_id: lesson.module_id(),
            title: lesson.title().to_owned(),
            content: lesson.content().clone(),
            duration_minutes: lesson.duration_minutes(),
            order: lesson.order(),
            free_preview: lesson.free_preview(),
        }
    }
}

/// Insert shape for an enrollment; the repository assigns the id and seeds
/// the progress ledger.
#[derive(Debug, Clone)]
pub struct NewEnrollmentRecord {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub enrolled_at: DateTime<Utc>,
}

/// Enrollment-level rollup state after a ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollup {
    pub completed_at: Option<DateTime<Utc>>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for the content graph: courses, modules, lessons.
///
/// `lessons_of` is the canonical lesson sequence (module order, then lesson
/// order) that every progress computation relies on.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert a course and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the slug is already taken.
    async fn insert_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError>;

    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by id; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Fetch a course by slug; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>, StorageError>;

    /// List published courses ordered by id, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn list_published_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError>;

    /// Insert a module and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the order collides within the
    /// course, `StorageError::NotFound` when the course does not exist.
    async fn insert_module(&self, module: NewModuleRecord) -> Result<ModuleId, StorageError>;

    /// Insert a lesson and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the order collides within the
    /// module, `StorageError::NotFound` when the module does not exist.
    async fn insert_lesson(&self, lesson: NewLessonRecord) -> Result<LessonId, StorageError>;

    /// Modules of a course in order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn modules_of(&self, course_id: CourseId) -> Result<Vec<CourseModule>, StorageError>;

    /// The canonical lesson sequence of a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn lessons_of(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;

    /// Number of lessons currently in the course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn lesson_count(&self, course_id: CourseId) -> Result<u32, StorageError>;

    /// Summed lesson duration of the course in minutes. Derived, never stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn total_duration_minutes(&self, course_id: CourseId) -> Result<u32, StorageError>;
}

/// Repository contract for enrollments.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Create an enrollment and seed one incomplete progress record per
    /// lesson id, all-or-nothing. A partially seeded ledger must never be
    /// observable.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when an active enrollment already
    /// exists for the same (student, course) pair.
    async fn insert_enrollment(
        &self,
        enrollment: NewEnrollmentRecord,
        lesson_ids: &[LessonId],
    ) -> Result<EnrollmentId, StorageError>;

    /// Fetch an enrollment by id; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Option<Enrollment>, StorageError>;

    /// The active enrollment for a (student, course) pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn find_active(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// Active enrollments of a student, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn list_active_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Enrollment>, StorageError>;

    /// Mark an enrollment inactive. Progress records are retained.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the enrollment does not exist.
    async fn deactivate(&self, id: EnrollmentId) -> Result<(), StorageError>;

    /// Number of active enrollments in a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn active_enrollment_count(&self, course_id: CourseId) -> Result<u32, StorageError>;
}

/// Repository contract for the progress ledger.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the record for one (enrollment, lesson) pair; `Ok(None)` when
    /// the lesson is not part of the enrollment's ledger.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn get_record(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// All records of an enrollment in canonical lesson order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn records_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Most recently accessed records of an enrollment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failure.
    async fn recent_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
        limit: u32,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Persist a mutated record and recompute the enrollment rollup in the
    /// same transaction: `completed_at` is set (once, at `now`) when every
    /// record of the enrollment is complete, and cleared otherwise.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the record's enrollment does
    /// not exist.
    async fn apply_progress(
        &self,
        record: &ProgressRecord,
        now: DateTime<Utc>,
    ) -> Result<Rollup, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    courses: HashMap<CourseId, Course>,
    modules: HashMap<ModuleId, CourseModule>,
    lessons: HashMap<LessonId, Lesson>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    progress: HashMap<(EnrollmentId, LessonId), ProgressRecord>,
    next_course_id: u64,
    next_module_id: u64,
    next_lesson_id: u64,
    next_enrollment_id: u64,
}

/// Simple in-memory repository implementation for service tests.
///
/// A single mutex over the whole state makes every operation trivially
/// transactional, which is exactly what the seeding and rollup contracts
/// require.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

/// Canonical sort key for a lesson: (module order, lesson order).
fn canonical_key(state: &InMemoryState, lesson_id: LessonId) -> (u32, u32, u64) {
    match state.lessons.get(&lesson_id) {
        Some(lesson) => {
            let module_order = state
                .modules
                .get(&lesson.module_id())
                .map_or(u32::MAX, CourseModule::order);
            (module_order, lesson.order(), lesson_id.value())
        }
        None => (u32::MAX, u32::MAX, lesson_id.value()),
    }
}

fn recompute_rollup(
    state: &mut InMemoryState,
    enrollment_id: EnrollmentId,
    now: DateTime<Utc>,
) -> Result<Rollup, StorageError> {
    let records: Vec<&ProgressRecord> = state
        .progress
        .values()
        .filter(|r| r.enrollment_id() == enrollment_id)
        .collect();
    let all_complete = !records.is_empty() && records.iter().all(|r| r.is_completed());

    let enrollment = state
        .enrollments
        .get_mut(&enrollment_id)
        .ok_or(StorageError::NotFound)?;
    if all_complete {
        enrollment.mark_completed(now);
    } else {
        enrollment.clear_completed();
    }
    Ok(Rollup {
        completed_at: enrollment.completed_at(),
    })
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn insert_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError> {
        let mut state = self.lock()?;
        if state.courses.values().any(|c| c.slug() == course.slug) {
            return Err(StorageError::Conflict);
        }
        state.next_course_id += 1;
        let id = CourseId::new(state.next_course_id);
        let stored = Course::new(
            id,
            course.title,
            Some(course.slug),
            course.description,
            course.level,
            course.status,
            course.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.courses.insert(id, stored);
        Ok(id)
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        state.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let state = self.lock()?;
        Ok(state.courses.get(&id).cloned())
    }

    async fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>, StorageError> {
        let state = self.lock()?;
        Ok(state.courses.values().find(|c| c.slug() == slug).cloned())
    }

    async fn list_published_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let state = self.lock()?;
        let mut courses: Vec<Course> = state
            .courses
            .values()
            .filter(|c| c.is_published())
            .cloned()
            .collect();
        courses.sort_by_key(Course::id);
        courses.truncate(limit as usize);
        Ok(courses)
    }

    async fn insert_module(&self, module: NewModuleRecord) -> Result<ModuleId, StorageError> {
        let mut state = self.lock()?;
        if !state.courses.contains_key(&module.course_id) {
            return Err(StorageError::NotFound);
        }
        let collision = state
            .modules
            .values()
            .any(|m| m.course_id() == module.course_id && m.order() == module.order);
        if collision {
            return Err(StorageError::Conflict);
        }
        state.next_module_id += 1;
        let id = ModuleId::new(state.next_module_id);
        let stored = CourseModule::new(
            id,
            module.course_id,
            module.title,
            module.description,
            module.order,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.modules.insert(id, stored);
        Ok(id)
    }

    async fn insert_lesson(&self, lesson: NewLessonRecord) -> Result<LessonId, StorageError> {
        let mut state = self.lock()?;
        if !state.modules.contains_key(&lesson.module_id) {
            return Err(StorageError::NotFound);
        }
        let collision = state
            .lessons
            .values()
            .any(|l| l.module_id() == lesson.module_id && l.order() == lesson.order);
        if collision {
            return Err(StorageError::Conflict);
        }
        state.next_lesson_id += 1;
        let id = LessonId::new(state.next_lesson_id);
        let stored = Lesson::new(
            id,
            lesson.module_id,
            lesson.title,
            lesson.content,
            lesson.duration_minutes,
            lesson.order,
            lesson.free_preview,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.lessons.insert(id, stored);
        Ok(id)
    }

    async fn modules_of(&self, course_id: CourseId) -> Result<Vec<CourseModule>, StorageError> {
        let state = self.lock()?;
        let mut modules: Vec<CourseModule> = state
            .modules
            .values()
            .filter(|m| m.course_id() == course_id)
            .cloned()
            .collect();
        modules.sort_by_key(CourseModule::order);
        Ok(modules)
    }

    async fn lessons_of(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let state = self.lock()?;
        let mut lessons: Vec<Lesson> = state
            .lessons
            .values()
            .filter(|l| {
                state
                    .modules
                    .get(&l.module_id())
                    .is_some_and(|m| m.course_id() == course_id)
            })
            .cloned()
            .collect();
        lessons.sort_by_key(|l| canonical_key(&state, l.id()));
        Ok(lessons)
    }

    async fn lesson_count(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let lessons = self.lessons_of(course_id).await?;
        Ok(u32::try_from(lessons.len()).unwrap_or(u32::MAX))
    }

    async fn total_duration_minutes(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let lessons = self.lessons_of(course_id).await?;
        Ok(lessons.iter().map(Lesson::duration_minutes).sum())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(
        &self,
        enrollment: NewEnrollmentRecord,
        lesson_ids: &[LessonId],
    ) -> Result<EnrollmentId, StorageError> {
        let mut state = self.lock()?;
        let duplicate = state.enrollments.values().any(|e| {
            e.student_id() == enrollment.student_id
                && e.course_id() == enrollment.course_id
                && e.is_active()
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }

        state.next_enrollment_id += 1;
        let id = EnrollmentId::new(state.next_enrollment_id);
        state.enrollments.insert(
            id,
            Enrollment::new(
                id,
                enrollment.student_id,
                enrollment.course_id,
                enrollment.enrolled_at,
            ),
        );
        for lesson_id in lesson_ids {
            state
                .progress
                .insert((id, *lesson_id), ProgressRecord::seeded(id, *lesson_id));
        }
        Ok(id)
    }

    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Option<Enrollment>, StorageError> {
        let state = self.lock()?;
        Ok(state.enrollments.get(&id).cloned())
    }

    async fn find_active(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .enrollments
            .values()
            .find(|e| {
                e.student_id() == student_id && e.course_id() == course_id && e.is_active()
            })
            .cloned())
    }

    async fn list_active_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Enrollment>, StorageError> {
        let state = self.lock()?;
        let mut enrollments: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|e| e.student_id() == student_id && e.is_active())
            .cloned()
            .collect();
        enrollments.sort_by_key(|e| std::cmp::Reverse(e.id()));
        Ok(enrollments)
    }

    async fn deactivate(&self, id: EnrollmentId) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        let enrollment = state.enrollments.get_mut(&id).ok_or(StorageError::NotFound)?;
        enrollment.deactivate();
        Ok(())
    }

    async fn active_enrollment_count(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let state = self.lock()?;
        let count = state
            .enrollments
            .values()
            .filter(|e| e.course_id() == course_id && e.is_active())
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_record(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        Ok(state.progress.get(&(enrollment_id, lesson_id)).cloned())
    }

    async fn records_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        let mut records: Vec<ProgressRecord> = state
            .progress
            .values()
            .filter(|r| r.enrollment_id() == enrollment_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| canonical_key(&state, r.lesson_id()));
        Ok(records)
    }

    async fn recent_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
        limit: u32,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let state = self.lock()?;
        let mut records: Vec<ProgressRecord> = state
            .progress
            .values()
            .filter(|r| r.enrollment_id() == enrollment_id && r.last_accessed().is_some())
            .cloned()
            .collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.last_accessed()));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn apply_progress(
        &self,
        record: &ProgressRecord,
        now: DateTime<Utc>,
    ) -> Result<Rollup, StorageError> {
        let mut state = self.lock()?;
        let key = (record.enrollment_id(), record.lesson_id());
        if !state.progress.contains_key(&key) {
            return Err(StorageError::NotFound);
        }
        state.progress.insert(key, record.clone());
        recompute_rollup(&mut state, record.enrollment_id(), now)
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            catalog: Arc::new(repo.clone()),
            enrollments: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CourseLevel, CourseStatus};
    use course_core::time::fixed_now;

    async fn seed_catalog(repo: &InMemoryRepository) -> (CourseId, Vec<LessonId>) {
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
        for order in 1..=3 {
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
        (course_id, lesson_ids)
    }

    #[tokio::test]
    async fn seeds_ledger_with_enrollment() {
        let repo = InMemoryRepository::new();
        let (course_id, lesson_ids) = seed_catalog(&repo).await;

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

        let records = repo.records_for_enrollment(enrollment_id).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.is_completed()));
    }

    #[tokio::test]
    async fn rejects_duplicate_active_enrollment() {
        let repo = InMemoryRepository::new();
        let (course_id, lesson_ids) = seed_catalog(&repo).await;
        let record = NewEnrollmentRecord {
            student_id: StudentId::new(1),
            course_id,
            enrolled_at: fixed_now(),
        };

        repo.insert_enrollment(record.clone(), &lesson_ids)
            .await
            .unwrap();
        let err = repo
            .insert_enrollment(record, &lesson_ids)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn apply_progress_maintains_rollup() {
        let repo = InMemoryRepository::new();
        let (course_id, lesson_ids) = seed_catalog(&repo).await;
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

        let now = fixed_now();
        for (i, lesson_id) in lesson_ids.iter().enumerate() {
            let mut record = repo
                .get_record(enrollment_id, *lesson_id)
                .await
                .unwrap()
                .unwrap();
            record.mark_complete(now);
            let rollup = repo.apply_progress(&record, now).await.unwrap();
            let expect_complete = i == lesson_ids.len() - 1;
            assert_eq!(rollup.completed_at.is_some(), expect_complete);
        }

        // resetting any lesson clears the rollup again
        let mut record = repo
            .get_record(enrollment_id, lesson_ids[0])
            .await
            .unwrap()
            .unwrap();
        record.reset(now);
        let rollup = repo.apply_progress(&record, now).await.unwrap();
        assert_eq!(rollup.completed_at, None);
    }

    #[tokio::test]
    async fn module_order_collision_conflicts() {
        let repo = InMemoryRepository::new();
        let (course_id, _) = seed_catalog(&repo).await;
        let err = repo
            .insert_module(NewModuleRecord {
                course_id,
                title: "Clash".into(),
                description: None,
                order: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }
}
