use thiserror::Error;

use crate::model::ids::{CourseId, ModuleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,
}

/// Ordered group of lessons within a course.
///
/// `order` is unique within the owning course; the canonical lesson sequence
/// sorts by `(module order, lesson order)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseModule {
    id: ModuleId,
    course_id: CourseId,
    title: String,
    description: Option<String>,
    order: u32,
}

impl CourseModule {
    /// Creates a new module.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::EmptyTitle` if the title is empty or
    /// whitespace-only.
    pub fn new(
        id: ModuleId,
        course_id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        order: u32,
    ) -> Result<Self, ModuleError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(ModuleError::EmptyTitle);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            course_id,
            title,
            description,
            order,
        })
    }

    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }
}
