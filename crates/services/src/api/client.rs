use async_trait::async_trait;
use course_core::Clock;
use course_core::model::{
    CompletedSet, Course, CourseSlug, CourseSummary, ModuleDetail, ModuleSlug, ProgressRecord,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use storage::repository::{CatalogRepository, CompletionRequest, ProgressRepository};
use storage::StorageError;
use tracing::{debug, info, warn};
use url::Url;

use super::dto::{
    CompleteModuleBody, CourseDetailDto, CourseListItemDto, ErrorBody, ModuleDetailDto,
    UserProgressDto,
};
use crate::auth::AuthSession;
use crate::config::ApiConfig;
use crate::error::ConfigError;

/// HTTP client for the course backend.
///
/// Serves as both the catalog and the authoritative progress store.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: AuthSession,
    clock: Clock,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, auth: AuthSession) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url().clone(),
            auth,
            clock: Clock::default(),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn url(&self, path: &str) -> Result<Url, StorageError> {
        self.base_url
            .join(path)
            .map_err(|e| StorageError::Connection(format!("invalid request path {path}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.token() {
            Some(token) => request.header("Authorization", format!("Token {}", token.expose())),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StorageError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, StorageError> {
        debug!(%url, "GET");
        self.send(self.client.get(url)).await
    }

    async fn fetch_progress(&self, course: &CourseSlug) -> Result<Vec<ProgressRecord>, StorageError> {
        let mut url = self.url("progress/course_progress/")?;
        url.query_pairs_mut().append_pair("course", course.as_str());
        let rows: Vec<UserProgressDto> = self.get(url).await?;
        let now = self.clock.now();
        rows.into_iter().map(|row| row.into_domain(now)).collect()
    }
}

async fn check_status(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StorageError::Unauthorized),
        StatusCode::NOT_FOUND => Err(StorageError::NotFound),
        _ => {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail.or(body.error))
                .unwrap_or_else(|| "request failed".to_owned());
            Err(StorageError::Connection(format!("HTTP {status}: {detail}")))
        }
    }
}

#[async_trait]
impl CatalogRepository for ApiClient {
    async fn list_courses(&self) -> Result<Vec<CourseSummary>, StorageError> {
        let rows: Vec<CourseListItemDto> = self.get(self.url("courses/")?).await?;
        rows.into_iter().map(CourseListItemDto::into_domain).collect()
    }

    async fn get_course(&self, course: &CourseSlug) -> Result<Course, StorageError> {
        let dto: CourseDetailDto = self.get(self.url(&format!("courses/{course}/"))?).await?;
        dto.into_domain()
    }

    async fn get_module(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
    ) -> Result<ModuleDetail, StorageError> {
        let url = self.url(&format!("courses/{course}/modules/{module}/"))?;
        let dto: ModuleDetailDto = self.get(url).await?;
        dto.into_domain()
    }
}

#[async_trait]
impl ProgressRepository for ApiClient {
    async fn course_progress(
        &self,
        course: &CourseSlug,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        if self.auth.token().is_none() {
            return Err(StorageError::Unauthorized);
        }
        self.fetch_progress(course).await
    }

    /// The backend overwrites timestamps on repeated completions and does not
    /// check module order, so both are checked here against a fresh read
    /// before posting.
    async fn record_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<ProgressRecord, StorageError> {
        if self.auth.token().is_none() {
            return Err(StorageError::Unauthorized);
        }

        let existing = self.fetch_progress(&request.course).await?;
        if let Some(done) = existing
            .iter()
            .find(|r| r.module() == &request.module && r.is_completed())
        {
            debug!(course = %request.course, module = %request.module, "already completed remotely");
            return Ok(done.clone());
        }
        request.check_prerequisite(&CompletedSet::from_records(&existing))?;

        let body = CompleteModuleBody {
            course_slug: request.course.as_str(),
            module_slug: request.module.as_str(),
            reflection_answers: &request.answers,
        };
        let url = self.url("progress/complete_module/")?;
        let dto: UserProgressDto = self
            .send(self.client.post(url).json(&body))
            .await
            .inspect_err(|err| {
                warn!(course = %request.course, module = %request.module, error = %err, "completion rejected");
            })?;
        let record = dto.into_domain(self.clock.now())?;
        info!(course = %request.course, module = %request.module, "completion confirmed by server");
        Ok(record)
    }
}
