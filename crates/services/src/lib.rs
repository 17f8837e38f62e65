#![forbid(unsafe_code)]

pub mod app_services;
pub mod caller;
pub mod catalog_service;
pub mod enrollment_service;
pub mod error;
pub mod progress_service;
pub mod summary;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use caller::Caller;
pub use catalog_service::{CatalogService, CourseStats};
pub use enrollment_service::EnrollmentService;
pub use error::{AppServicesError, CatalogServiceError, EnrollmentError, ProgressError};
pub use progress_service::ProgressService;
pub use summary::{EnrollmentSummary, NextLesson, RecentLesson};
