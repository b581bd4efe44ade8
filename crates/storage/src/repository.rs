use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    CompletedSet, Course, CourseSlug, CourseSummary, ModuleDetail, ModuleSlug, ProgressRecord,
    ReflectionAnswers,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not authenticated")]
    Unauthorized,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Everything a store needs to record one module completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub course: CourseSlug,
    pub module: ModuleSlug,
    /// Module that has to be complete first; `None` for the first module.
    pub prerequisite: Option<ModuleSlug>,
    pub answers: ReflectionAnswers,
    /// Used by local stores; remote stores stamp their own time.
    pub requested_at: DateTime<Utc>,
}

impl CompletionRequest {
    /// Store-side sequential check against the stored completed set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the prerequisite is not complete.
    pub fn check_prerequisite(&self, completed: &CompletedSet) -> Result<(), StorageError> {
        match &self.prerequisite {
            Some(prev) if !completed.contains(prev) => Err(StorageError::Conflict(format!(
                "module {} requires {} to be completed first",
                self.module, prev
            ))),
            _ => Ok(()),
        }
    }
}

/// Read-only access to the course catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// List every published course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_courses(&self) -> Result<Vec<CourseSummary>, StorageError>;

    /// Fetch a course with its ordered module list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_course(&self, course: &CourseSlug) -> Result<Course, StorageError>;

    /// Fetch the full content of one module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course or module is missing.
    async fn get_module(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
    ) -> Result<ModuleDetail, StorageError>;
}

/// Repository contract for a learner's progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// All progress records of the current learner for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the read fails; callers treat that as
    /// "progress unknown".
    async fn course_progress(
        &self,
        course: &CourseSlug,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Mark a module complete. Completing an already completed module
    /// returns the stored record untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the prerequisite is not complete,
    /// or other storage errors if the write fails.
    async fn record_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<ProgressRecord, StorageError>;

    /// Remember the module the learner opened last. Stores without a notion
    /// of "current module" ignore this.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn mark_current(
        &self,
        _course: &CourseSlug,
        _module: &ModuleSlug,
        _at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        Ok(())
    }
}

type ProgressKey = (CourseSlug, ModuleSlug);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<Vec<Course>>>,
    modules: Arc<Mutex<HashMap<ProgressKey, ModuleDetail>>>,
    progress: Arc<Mutex<HashMap<ProgressKey, ProgressRecord>>>,
    current: Arc<Mutex<HashMap<CourseSlug, ModuleSlug>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a course in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn upsert_course(&self, course: Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        match guard.iter_mut().find(|c| c.slug() == course.slug()) {
            Some(existing) => *existing = course,
            None => guard.push(course),
        }
        Ok(())
    }

    /// Add or replace module content.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn upsert_module(
        &self,
        course: &CourseSlug,
        detail: ModuleDetail,
    ) -> Result<(), StorageError> {
        let mut guard = self.modules.lock().map_err(poisoned)?;
        guard.insert((course.clone(), detail.slug().clone()), detail);
        Ok(())
    }

    /// The module last passed to `mark_current` for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn current_module(&self, course: &CourseSlug) -> Result<Option<ModuleSlug>, StorageError> {
        let guard = self.current.lock().map_err(poisoned)?;
        Ok(guard.get(course).cloned())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn list_courses(&self) -> Result<Vec<CourseSummary>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard.iter().map(Course::summary).collect())
    }

    async fn get_course(&self, course: &CourseSlug) -> Result<Course, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|c| c.slug() == course)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_module(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
    ) -> Result<ModuleDetail, StorageError> {
        let guard = self.modules.lock().map_err(poisoned)?;
        guard
            .get(&(course.clone(), module.clone()))
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn course_progress(
        &self,
        course: &CourseSlug,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        let mut records: Vec<ProgressRecord> = guard
            .values()
            .filter(|r| r.course() == course)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.module().cmp(b.module()));
        Ok(records)
    }

    async fn record_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<ProgressRecord, StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let key = (request.course.clone(), request.module.clone());
        if let Some(existing) = guard.get(&key).filter(|r| r.is_completed()) {
            return Ok(existing.clone());
        }

        let completed = CompletedSet::from_records(
            guard.values().filter(|r| r.course() == &request.course),
        );
        request.check_prerequisite(&completed)?;

        let record = ProgressRecord::completed(
            request.course.clone(),
            request.module.clone(),
            request.requested_at,
            request.answers.clone(),
        );
        guard.insert(key, record.clone());
        Ok(record)
    }

    async fn mark_current(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
        _at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.current.lock().map_err(poisoned)?;
        guard.insert(course.clone(), module.clone());
        Ok(())
    }
}

/// Aggregates catalog and progress repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self { catalog, progress }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { catalog, progress }
    }
}
