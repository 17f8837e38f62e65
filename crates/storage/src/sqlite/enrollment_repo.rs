use course_core::model::{CourseId, Enrollment, EnrollmentId, LessonId, StudentId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{enrollment_id_from_i64, id_i64, map_enrollment_row, ser};
use crate::repository::{EnrollmentRepository, NewEnrollmentRecord, StorageError};

fn insert_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(
        &self,
        enrollment: NewEnrollmentRecord,
        lesson_ids: &[LessonId],
    ) -> Result<EnrollmentId, StorageError> {
        // Enrollment row and ledger seed commit together or not at all; the
        // partial unique index turns a concurrent duplicate into Conflict.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
            INSERT INTO enrollments (student_id, course_id, enrolled_at, is_active)
            VALUES (?1, ?2, ?3, 1)
            ",
        )
        .bind(id_i64("student_id", enrollment.student_id.value())?)
        .bind(id_i64("course_id", enrollment.course_id.value())?)
        .bind(enrollment.enrolled_at)
        .execute(&mut *tx)
        .await
        .map_err(insert_err)?;

        let enrollment_id = res.last_insert_rowid();

        for lesson_id in lesson_ids {
            sqlx::query(
                r"
                INSERT INTO progress_records (enrollment_id, lesson_id, completed_at, last_accessed)
                VALUES (?1, ?2, NULL, NULL)
                ",
            )
            .bind(enrollment_id)
            .bind(id_i64("lesson_id", lesson_id.value())?)
            .execute(&mut *tx)
            .await
            .map_err(insert_err)?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        enrollment_id_from_i64(enrollment_id)
    }

    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, student_id, course_id, enrolled_at, completed_at, is_active
            FROM enrollments WHERE id = ?1
            ",
        )
        .bind(id_i64("enrollment_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn find_active(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, student_id, course_id, enrolled_at, completed_at, is_active
            FROM enrollments
            WHERE student_id = ?1 AND course_id = ?2 AND is_active = 1
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn list_active_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Enrollment>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, student_id, course_id, enrolled_at, completed_at, is_active
            FROM enrollments
            WHERE student_id = ?1 AND is_active = 1
            ORDER BY id DESC
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut enrollments = Vec::with_capacity(rows.len());
        for row in &rows {
            enrollments.push(map_enrollment_row(row)?);
        }
        Ok(enrollments)
    }

    async fn deactivate(&self, id: EnrollmentId) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE enrollments SET is_active = 0 WHERE id = ?1")
            .bind(id_i64("enrollment_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn active_enrollment_count(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS n
            FROM enrollments
            WHERE course_id = ?1 AND is_active = 1
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let n: i64 = row.try_get("n").map_err(ser)?;
        u32::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }
}
