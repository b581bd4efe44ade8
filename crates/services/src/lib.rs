#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod auth;
pub mod catalog_service;
pub mod config;
pub mod error;
pub mod progress;

pub use course_core::Clock;

pub use api::ApiClient;
pub use app_services::AppServices;
pub use auth::{AuthSession, AuthToken, Identity};
pub use catalog_service::CatalogService;
pub use config::{ApiConfig, AppConfig};
pub use error::{AppServicesError, CatalogError, ConfigError, ProgressError};
pub use progress::{
    CompletionOutcome, CourseProgress, Freshness, ModuleView, NextStep, ProgressService,
};
