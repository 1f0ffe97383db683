#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod identity;
pub mod progress_service;
pub mod sync;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use error::{AppServicesError, CatalogServiceError, ProgressServiceError};
pub use identity::IdentityService;
pub use progress_service::{ModuleProgressView, ProgressService};
pub use sync::{ProgressSync, SyncOutcome};
