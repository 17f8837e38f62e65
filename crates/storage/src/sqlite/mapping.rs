use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use course_core::model::{
    Course, CourseId, CourseLevel, CourseModule, CourseStatus, Enrollment, EnrollmentId, Lesson,
    LessonContent, LessonId, ModuleId, ProgressRecord, StudentId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn enrollment_id_from_i64(v: i64) -> Result<EnrollmentId, StorageError> {
    Ok(EnrollmentId::new(i64_to_u64("enrollment_id", v)?))
}

pub(crate) fn ord_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

//
// ─── ENUM CODECS ───────────────────────────────────────────────────────────────
//

/// Storage encoding of a course status. Must stay consistent with
/// `status_from_str`.
pub(crate) fn status_to_str(status: CourseStatus) -> &'static str {
    status.as_str()
}

pub(crate) fn status_from_str(s: &str) -> Result<CourseStatus, StorageError> {
    match s {
        "draft" => Ok(CourseStatus::Draft),
        "published" => Ok(CourseStatus::Published),
        "archived" => Ok(CourseStatus::Archived),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn level_to_str(level: CourseLevel) -> &'static str {
    level.as_str()
}

pub(crate) fn level_from_str(s: &str) -> Result<CourseLevel, StorageError> {
    match s {
        "beginner" => Ok(CourseLevel::Beginner),
        "intermediate" => Ok(CourseLevel::Intermediate),
        "advanced" => Ok(CourseLevel::Advanced),
        _ => Err(StorageError::Serialization(format!("invalid level: {s}"))),
    }
}

/// Splits lesson content into its (kind, video_url, body) columns.
pub(crate) fn content_to_columns(
    content: &LessonContent,
) -> (&'static str, Option<String>, Option<String>) {
    match content {
        LessonContent::Video { url } => ("video", Some(url.clone()), None),
        LessonContent::Article { body } => ("article", None, Some(body.clone())),
    }
}

pub(crate) fn content_from_columns(
    kind: &str,
    video_url: Option<String>,
    body: Option<String>,
) -> Result<LessonContent, StorageError> {
    match kind {
        "video" => Ok(LessonContent::Video {
            url: video_url
                .ok_or_else(|| StorageError::Serialization("missing video_url".into()))?,
        }),
        "article" => Ok(LessonContent::Article {
            body: body.ok_or_else(|| StorageError::Serialization("missing body".into()))?,
        }),
        _ => Err(StorageError::Serialization(format!("invalid kind: {kind}"))),
    }
}

//
// ─── ROW MAPPERS ───────────────────────────────────────────────────────────────
//

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Course::new(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        Some(row.try_get::<String, _>("slug").map_err(ser)?),
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        level_from_str(&row.try_get::<String, _>("level").map_err(ser)?)?,
        status_from_str(&row.try_get::<String, _>("status").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<CourseModule, StorageError> {
    CourseModule::new(
        module_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        ord_from_i64("ord", row.try_get::<i64, _>("ord").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    let content = content_from_columns(
        &row.try_get::<String, _>("kind").map_err(ser)?,
        row.try_get::<Option<String>, _>("video_url").map_err(ser)?,
        row.try_get::<Option<String>, _>("body").map_err(ser)?,
    )?;

    Lesson::new(
        lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        module_id_from_i64(row.try_get::<i64, _>("module_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        content,
        ord_from_i64(
            "duration_minutes",
            row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
        )?,
        ord_from_i64("ord", row.try_get::<i64, _>("ord").map_err(ser)?)?,
        row.try_get::<i64, _>("free_preview").map_err(ser)? != 0,
    )
    .map_err(ser)
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    Ok(Enrollment::from_persisted(
        enrollment_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        StudentId::new(i64_to_u64(
            "student_id",
            row.try_get::<i64, _>("student_id").map_err(ser)?,
        )?),
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get("enrolled_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        row.try_get::<i64, _>("is_active").map_err(ser)? != 0,
    ))
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    Ok(ProgressRecord::from_persisted(
        enrollment_id_from_i64(row.try_get::<i64, _>("enrollment_id").map_err(ser)?)?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        row.try_get("completed_at").map_err(ser)?,
        row.try_get("last_accessed").map_err(ser)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codec_roundtrip() {
        for status in [
            CourseStatus::Draft,
            CourseStatus::Published,
            CourseStatus::Archived,
        ] {
            assert_eq!(status_from_str(status_to_str(status)).unwrap(), status);
        }
        assert!(status_from_str("retired").is_err());
    }

    #[test]
    fn level_codec_roundtrip() {
        for level in [
            CourseLevel::Beginner,
            CourseLevel::Intermediate,
            CourseLevel::Advanced,
        ] {
            assert_eq!(level_from_str(level_to_str(level)).unwrap(), level);
        }
    }

    #[test]
    fn content_codec_rejects_missing_payload() {
        assert!(content_from_columns("video", None, None).is_err());
        assert!(content_from_columns("article", None, None).is_err());
        assert!(content_from_columns("podcast", None, None).is_err());

        let content =
            content_from_columns("video", Some("https://example.com/v.mp4".into()), None).unwrap();
        assert!(matches!(content, LessonContent::Video { .. }));
    }
}
