use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CourseId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title must be at least 5 characters long")]
    TitleTooShort,

    #[error("course slug cannot be empty")]
    EmptySlug,
}

//
// ─── STATUS & LEVEL ────────────────────────────────────────────────────────────
//

/// Lifecycle status of a course. Only published courses accept enrollments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Published => "published",
            CourseStatus::Archived => "archived",
        }
    }
}

/// Difficulty level shown in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Beginner => "beginner",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Advanced => "advanced",
        }
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// Top-level content unit owning an ordered sequence of modules.
///
/// Lesson count and total duration are derived from the lesson set and never
/// stored on the course itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    id: CourseId,
    title: String,
    slug: String,
    description: Option<String>,
    level: CourseLevel,
    status: CourseStatus,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a new course. The slug is derived from the title when not
    /// supplied.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::TitleTooShort` if the trimmed title is shorter
    /// than 5 characters, or `CourseError::EmptySlug` if an explicit slug
    /// trims down to nothing.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        slug: Option<String>,
        description: Option<String>,
        level: CourseLevel,
        status: CourseStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into().trim().to_owned();
        if title.chars().count() < 5 {
            return Err(CourseError::TitleTooShort);
        }

        let slug = match slug {
            Some(s) => {
                let s = slugify(&s);
                if s.is_empty() {
                    return Err(CourseError::EmptySlug);
                }
                s
            }
            None => slugify(&title),
        };

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            title,
            slug,
            description,
            level,
            status,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn level(&self) -> CourseLevel {
        self.level
    }

    #[must_use]
    pub fn status(&self) -> CourseStatus {
        self.status
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == CourseStatus::Published
    }

    /// Returns a copy of the course with the given status.
    #[must_use]
    pub fn with_status(mut self, status: CourseStatus) -> Self {
        self.status = status;
        self
    }
}

/// Lowercases, keeps alphanumerics, and joins words with hyphens.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
