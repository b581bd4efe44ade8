use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::auth::AuthToken;
use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_DB_URL: &str = "sqlite:course-progress.sqlite3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach the course backend.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: Url,
    pub timeout: Duration,
}

impl ApiConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `raw` is not an absolute URL.
    pub fn new(raw: &str, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(raw)?,
            timeout,
        })
    }

    /// Base URL, always ending in `/` so relative joins keep the API prefix.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| ConfigError::InvalidUrl {
        raw: raw.to_owned(),
        source,
    })
}

/// Runtime configuration, read from `COURSE_*` environment variables.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub token: Option<AuthToken>,
    pub db_url: String,
    pub catalog_path: Option<PathBuf>,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` for a malformed URL or timeout.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup (the environment, a map in tests).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a malformed URL or timeout.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("COURSE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let timeout = match lookup("COURSE_HTTP_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(raw) => parse_timeout(&raw)?,
        };

        Ok(Self {
            api: ApiConfig::new(&api_url, timeout)?,
            token: lookup("COURSE_API_TOKEN").and_then(AuthToken::new),
            db_url: lookup("COURSE_DB_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DB_URL.into()),
            catalog_path: lookup("COURSE_CATALOG_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            raw: raw.to_owned(),
        }),
    }
}
