mod course;
mod enrollment;
mod ids;
mod lesson;
mod module;
mod progress;

pub use ids::{CourseId, EnrollmentId, LessonId, ModuleId, ParseIdError, StudentId};

pub use course::{Course, CourseError, CourseLevel, CourseStatus, slugify};
pub use enrollment::Enrollment;
pub use lesson::{ContentKind, Lesson, LessonContent, LessonError};
pub use module::{CourseModule, ModuleError};
pub use progress::ProgressRecord;
