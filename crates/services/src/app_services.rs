use std::sync::Arc;

use storage::repository::{CatalogRepository, ProgressRepository, Storage};
use storage::JsonCatalog;
use tracing::info;

use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::catalog_service::CatalogService;
use crate::config::AppConfig;
use crate::error::{AppServicesError, ConfigError};
use crate::progress::ProgressService;
use crate::Clock;

/// Assembles the learner-facing services for one backend.
#[derive(Clone)]
pub struct AppServices {
    auth: AuthSession,
    catalog: CatalogService,
    progress: ProgressService,
}

impl AppServices {
    /// Build services against the remote course API.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Config` if the HTTP client cannot be built.
    pub fn remote(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let auth = AuthSession::with_token(config.token.clone());
        let api = Arc::new(ApiClient::new(&config.api, auth.clone())?.with_clock(clock));
        info!(
            api = %config.api.base_url(),
            signed_in = auth.is_authenticated(),
            "using remote course API"
        );
        let catalog: Arc<dyn CatalogRepository> = api.clone();
        let progress: Arc<dyn ProgressRepository> = api;
        Ok(Self::from_storage(Storage::new(catalog, progress), auth, clock))
    }

    /// Build services from a catalog file with progress kept in `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if no catalog path is configured, the
    /// catalog is invalid, or the database cannot be opened.
    pub async fn offline(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let path = config
            .catalog_path
            .as_ref()
            .ok_or(ConfigError::MissingCatalog)?;
        let catalog: Arc<dyn CatalogRepository> = Arc::new(JsonCatalog::from_path(path).await?);
        let storage = Storage::sqlite(&config.db_url, catalog).await?;
        info!(db = %config.db_url, catalog = %path.display(), "using offline progress");
        Ok(Self::from_storage(storage, AuthSession::local_learner(), clock))
    }

    #[must_use]
    pub fn from_storage(storage: Storage, auth: AuthSession, clock: Clock) -> Self {
        let catalog = CatalogService::new(Arc::clone(&storage.catalog));
        let progress = ProgressService::new(clock, auth.clone(), storage.catalog, storage.progress);
        Self {
            auth,
            catalog,
            progress,
        }
    }

    #[must_use]
    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }
}
