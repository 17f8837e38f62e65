use course_core::model::{Course, CourseId, CourseModule, Lesson, LessonId, ModuleId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    content_to_columns, course_id_from_i64, id_i64, lesson_id_from_i64, level_to_str,
    map_course_row, map_lesson_row, map_module_row, module_id_from_i64, ser, status_to_str,
};
use crate::repository::{
    CatalogRepository, NewCourseRecord, NewLessonRecord, NewModuleRecord, StorageError,
};

/// Maps sqlx errors, promoting unique-constraint violations to `Conflict`.
fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn insert_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO courses (title, slug, description, level, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(course.title)
        .bind(course.slug)
        .bind(course.description)
        .bind(level_to_str(course.level))
        .bind(status_to_str(course.status))
        .bind(course.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        course_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, slug, description, level, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                -- created_at stays from the original insert
                title = excluded.title,
                slug = excluded.slug,
                description = excluded.description,
                level = excluded.level,
                status = excluded.status
            ",
        )
        .bind(id_i64("course_id", course.id().value())?)
        .bind(course.title().to_owned())
        .bind(course.slug().to_owned())
        .bind(course.description().map(ToString::to_string))
        .bind(level_to_str(course.level()))
        .bind(status_to_str(course.status()))
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, slug, description, level, status, created_at
            FROM courses WHERE id = ?1
            ",
        )
        .bind(id_i64("course_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn get_course_by_slug(&self, slug: &str) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, slug, description, level, status, created_at
            FROM courses WHERE slug = ?1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn list_published_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, slug, description, level, status, created_at
            FROM courses
            WHERE status = 'published'
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in &rows {
            courses.push(map_course_row(row)?);
        }
        Ok(courses)
    }

    async fn insert_module(&self, module: NewModuleRecord) -> Result<ModuleId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO modules (course_id, title, description, ord)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_i64("course_id", module.course_id.value())?)
        .bind(module.title)
        .bind(module.description)
        .bind(i64::from(module.order))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        module_id_from_i64(res.last_insert_rowid())
    }

    async fn insert_lesson(&self, lesson: NewLessonRecord) -> Result<LessonId, StorageError> {
        let (kind, video_url, body) = content_to_columns(&lesson.content);
        let res = sqlx::query(
            r"
            INSERT INTO lessons (module_id, title, kind, video_url, body, duration_minutes, ord, free_preview)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_i64("module_id", lesson.module_id.value())?)
        .bind(lesson.title)
        .bind(kind)
        .bind(video_url)
        .bind(body)
        .bind(i64::from(lesson.duration_minutes))
        .bind(i64::from(lesson.order))
        .bind(i64::from(lesson.free_preview))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        lesson_id_from_i64(res.last_insert_rowid())
    }

    async fn modules_of(&self, course_id: CourseId) -> Result<Vec<CourseModule>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, description, ord
            FROM modules
            WHERE course_id = ?1
            ORDER BY ord ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut modules = Vec::with_capacity(rows.len());
        for row in &rows {
            modules.push(map_module_row(row)?);
        }
        Ok(modules)
    }

    async fn lessons_of(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        // canonical order: module first, then lesson
        let rows = sqlx::query(
            r"
            SELECT l.id, l.module_id, l.title, l.kind, l.video_url, l.body,
                   l.duration_minutes, l.ord, l.free_preview
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = ?1
            ORDER BY m.ord ASC, l.ord ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in &rows {
            lessons.push(map_lesson_row(row)?);
        }
        Ok(lessons)
    }

    async fn lesson_count(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS n
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = ?1
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let n: i64 = row.try_get("n").map_err(ser)?;
        u32::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }

    async fn total_duration_minutes(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COALESCE(SUM(l.duration_minutes), 0) AS total
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = ?1
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let total: i64 = row.try_get("total").map_err(ser)?;
        u32::try_from(total)
            .map_err(|_| StorageError::Serialization(format!("invalid duration: {total}")))
    }
}
