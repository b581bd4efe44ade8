use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{CourseSlug, ModuleSlug, ProgressRecord};
use sqlx::{Row, SqliteConnection};
use tracing::{debug, info};

use super::SqliteRepository;
use crate::local::{LocalCourseProgress, progress_key};
use crate::repository::{CompletionRequest, ProgressRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

async fn load_document(
    db: &mut SqliteConnection,
    key: &str,
) -> Result<Option<LocalCourseProgress>, StorageError> {
    let row = sqlx::query("SELECT value FROM local_progress WHERE key = ?1")
        .bind(key)
        .fetch_optional(&mut *db)
        .await
        .map_err(conn)?;

    let Some(row) = row else {
        return Ok(None);
    };
    let raw: String = row.try_get("value").map_err(ser)?;
    serde_json::from_str(&raw).map(Some).map_err(ser)
}

async fn store_document(
    db: &mut SqliteConnection,
    key: &str,
    doc: &LocalCourseProgress,
) -> Result<(), StorageError> {
    let value = serde_json::to_string(doc).map_err(ser)?;
    sqlx::query(
        r"
        INSERT INTO local_progress (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        ",
    )
    .bind(key)
    .bind(value)
    .bind(doc.last_accessed_at)
    .execute(&mut *db)
    .await
    .map_err(conn)?;
    Ok(())
}

impl SqliteRepository {
    /// Raw progress document for a course, if one was ever written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails or the document is malformed.
    pub async fn load_progress(
        &self,
        course: &CourseSlug,
    ) -> Result<Option<LocalCourseProgress>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        load_document(&mut db, &progress_key(course)).await
    }
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn course_progress(
        &self,
        course: &CourseSlug,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let doc = self.load_progress(course).await?;
        debug!(course = %course, found = doc.is_some(), "read local progress");
        Ok(doc.map(|d| d.records(course)).unwrap_or_default())
    }

    async fn record_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<ProgressRecord, StorageError> {
        let key = progress_key(&request.course);
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let mut doc = load_document(&mut tx, &key)
            .await?
            .unwrap_or_else(|| LocalCourseProgress::start(request.requested_at));

        if !doc.is_completed(&request.module) {
            request.check_prerequisite(&doc.completed_set())?;
            doc.complete(
                &request.module,
                request.answers.clone(),
                request.requested_at,
            );
            store_document(&mut tx, &key, &doc).await?;
            info!(course = %request.course, module = %request.module, "stored local completion");
        }
        tx.commit().await.map_err(conn)?;

        doc.record(&request.course, &request.module)
            .ok_or_else(|| StorageError::Serialization("completion missing after write".into()))
    }

    async fn mark_current(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let key = progress_key(course);
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut doc = load_document(&mut tx, &key)
            .await?
            .unwrap_or_else(|| LocalCourseProgress::start(at));
        doc.open(module, at);
        store_document(&mut tx, &key, &doc).await?;
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
