//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{ModuleSlug, ReflectionError};
use storage::StorageError;
use storage::catalog::CatalogLoadError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while reading configuration or building clients.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid API url {raw:?}: {source}")]
    InvalidUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid HTTP timeout {raw:?}, expected whole seconds > 0")]
    InvalidTimeout { raw: String },
    #[error("offline mode needs a catalog file")]
    MissingCatalog,
    #[error(transparent)]
    HttpClient(#[from] reqwest::Error),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("{kind} {slug} not found")]
    NotFound { kind: &'static str, slug: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the progress service and completion workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("reflection answers incomplete: {0}")]
    Validation(#[from] ReflectionError),
    #[error("sign in to track your progress")]
    Unauthorized,
    #[error("module {module} is locked until {prerequisite} is completed")]
    Locked {
        module: ModuleSlug,
        prerequisite: ModuleSlug,
    },
    #[error("{kind} {slug} not found")]
    NotFound { kind: &'static str, slug: String },
    #[error("failed to save progress: {0}")]
    Service(#[source] StorageError),
    #[error("course content unavailable: {0}")]
    Unavailable(#[source] StorageError),
}

impl ProgressError {
    /// True for transient failures the learner may simply retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProgressError::Service(_) | ProgressError::Unavailable(_))
    }
}

impl From<StorageError> for ProgressError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unauthorized => ProgressError::Unauthorized,
            other => ProgressError::Service(other),
        }
    }
}

impl From<CatalogError> for ProgressError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { kind, slug } => ProgressError::NotFound { kind, slug },
            CatalogError::Storage(StorageError::Unauthorized) => ProgressError::Unauthorized,
            CatalogError::Storage(other) => ProgressError::Unavailable(other),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),
}
