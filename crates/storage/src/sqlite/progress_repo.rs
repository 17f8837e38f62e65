use chrono::{DateTime, Utc};
use course_core::model::{EnrollmentId, LessonId, ProgressRecord};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{id_i64, map_progress_row, ser};
use crate::repository::{ProgressRepository, Rollup, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_record(
        &self,
        enrollment_id: EnrollmentId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT enrollment_id, lesson_id, completed_at, last_accessed
            FROM progress_records
            WHERE enrollment_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(id_i64("enrollment_id", enrollment_id.value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn records_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        // canonical order; records whose lesson was deleted sort last
        let rows = sqlx::query(
            r"
            SELECT p.enrollment_id, p.lesson_id, p.completed_at, p.last_accessed
            FROM progress_records p
            LEFT JOIN lessons l ON l.id = p.lesson_id
            LEFT JOIN modules m ON m.id = l.module_id
            WHERE p.enrollment_id = ?1
            ORDER BY m.ord ASC, l.ord ASC, p.lesson_id ASC
            ",
        )
        .bind(id_i64("enrollment_id", enrollment_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(map_progress_row(row)?);
        }
        Ok(records)
    }

    async fn recent_for_enrollment(
        &self,
        enrollment_id: EnrollmentId,
        limit: u32,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT enrollment_id, lesson_id, completed_at, last_accessed
            FROM progress_records
            WHERE enrollment_id = ?1 AND last_accessed IS NOT NULL
            ORDER BY last_accessed DESC
            LIMIT ?2
            ",
        )
        .bind(id_i64("enrollment_id", enrollment_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(map_progress_row(row)?);
        }
        Ok(records)
    }

    async fn apply_progress(
        &self,
        record: &ProgressRecord,
        now: DateTime<Utc>,
    ) -> Result<Rollup, StorageError> {
        let enrollment_id = id_i64("enrollment_id", record.enrollment_id().value())?;
        let lesson_id = id_i64("lesson_id", record.lesson_id().value())?;

        // The record write and the rollup recompute share one transaction so
        // a concurrent completion pair cannot leave the flag stale.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
            UPDATE progress_records
            SET completed_at = ?3, last_accessed = ?4
            WHERE enrollment_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .bind(record.completed_at())
        .bind(record.last_accessed())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COUNT(completed_at) AS done
            FROM progress_records
            WHERE enrollment_id = ?1
            ",
        )
        .bind(enrollment_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let total: i64 = row.try_get("total").map_err(ser)?;
        let done: i64 = row.try_get("done").map_err(ser)?;
        let all_complete = total > 0 && done == total;

        if all_complete {
            // set once: keep the first completion timestamp on re-completion
            sqlx::query(
                r"
                UPDATE enrollments
                SET completed_at = COALESCE(completed_at, ?2)
                WHERE id = ?1
                ",
            )
            .bind(enrollment_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        } else {
            sqlx::query("UPDATE enrollments SET completed_at = NULL WHERE id = ?1")
                .bind(enrollment_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        let row = sqlx::query("SELECT completed_at FROM enrollments WHERE id = ?1")
            .bind(enrollment_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;
        let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Rollup { completed_at })
    }
}
