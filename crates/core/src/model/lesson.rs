use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, ModuleId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title must be at least 3 characters long")]
    TitleTooShort,

    #[error("video lessons require a non-empty video URL")]
    MissingVideoUrl,

    #[error("article lessons require a non-empty body")]
    MissingArticleBody,
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// Payload of a lesson. A video must carry its URL; an article its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LessonContent {
    Video { url: String },
    Article { body: String },
}

/// Content kind without the payload, for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Video,
    Article,
}

impl ContentKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Article => "article",
        }
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Atomic content unit within a module.
///
/// Identity is immutable once a progress record references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    module_id: ModuleId,
    title: String,
    content: LessonContent,
    duration_minutes: u32,
    order: u32,
    free_preview: bool,
}

impl Lesson {
    /// Creates a new lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::TitleTooShort` if the trimmed title is shorter
    /// than 3 characters, or a content error if the payload for the chosen
    /// kind is empty.
    pub fn new(
        id: LessonId,
        module_id: ModuleId,
        title: impl Into<String>,
        content: LessonContent,
        duration_minutes: u32,
        order: u32,
        free_preview: bool,
    ) -> Result<Self, LessonError> {
        let title = title.into().trim().to_owned();
        if title.chars().count() < 3 {
            return Err(LessonError::TitleTooShort);
        }

        match &content {
            LessonContent::Video { url } if url.trim().is_empty() => {
                return Err(LessonError::MissingVideoUrl);
            }
            LessonContent::Article { body } if body.trim().is_empty() => {
                return Err(LessonError::MissingArticleBody);
            }
            _ => {}
        }

        Ok(Self {
            id,
            module_id,
            title,
            content,
            duration_minutes,
            order,
            free_preview,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &LessonContent {
        &self.content
    }

    #[must_use]
    pub fn kind(&self) -> ContentKind {
        match self.content {
            LessonContent::Video { .. } => ContentKind::Video,
            LessonContent::Article { .. } => ContentKind::Article,
        }
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn free_preview(&self) -> bool {
        self.free_preview
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn video(url: &str) -> LessonContent {
        LessonContent::Video {
            url: url.to_owned(),
        }
    }

    #[test]
    fn rejects_short_title() {
        let err = Lesson::new(
            LessonId::new(1),
            ModuleId::new(1),
            "ab",
            video("https://example.com/v.mp4"),
            10,
            0,
            false,
        )
        .unwrap_err();
        assert_eq!(err, LessonError::TitleTooShort);
    }

    #[test]
    fn video_requires_url() {
        let err = Lesson::new(
            LessonId::new(1),
            ModuleId::new(1),
            "Intro",
            video("   "),
            10,
            0,
            false,
        )
        .unwrap_err();
        assert_eq!(err, LessonError::MissingVideoUrl);
    }

    #[test]
    fn article_requires_body() {
        let err = Lesson::new(
            LessonId::new(1),
            ModuleId::new(1),
            "Intro",
            LessonContent::Article { body: "".into() },
            10,
            0,
            false,
        )
        .unwrap_err();
        assert_eq!(err, LessonError::MissingArticleBody);
    }

    #[test]
    fn reports_kind() {
        let lesson = Lesson::new(
            LessonId::new(1),
            ModuleId::new(1),
            "Intro",
            LessonContent::Article {
                body: "Welcome".into(),
            },
            7,
            2,
            true,
        )
        .unwrap();

        assert_eq!(lesson.kind(), ContentKind::Article);
        assert_eq!(lesson.duration_minutes(), 7);
        assert_eq!(lesson.order(), 2);
        assert!(lesson.free_preview());
    }
}
