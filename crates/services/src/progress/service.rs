use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use course_core::model::{CompletedSet, Course, CourseSlug, ModuleDetail, ModuleSlug};
use course_core::{CourseOverview, ModuleStatus};
use storage::repository::{CatalogRepository, ProgressRepository};
use tracing::{debug, warn};

use super::view::SessionView;
use crate::Clock;
use crate::auth::{AuthSession, Identity};
use crate::catalog_service::CatalogService;
use crate::error::ProgressError;

//
// ─── RESULT TYPES ──────────────────────────────────────────────────────────────
//

/// Where the completed set behind an overview came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Read from the store just now, merged with this session's completions.
    Live,
    /// Store read failed; this session's last known set was used.
    Cached,
    /// Store read failed and nothing was cached; treated as nothing completed.
    Unknown,
    /// No signed-in learner; nothing is tracked.
    Anonymous,
}

/// A course evaluated for the current learner.
#[derive(Debug, Clone)]
pub struct CourseProgress {
    pub course: Course,
    pub overview: CourseOverview,
    pub freshness: Freshness,
}

/// A module opened for reading.
#[derive(Debug, Clone)]
pub struct ModuleView {
    pub detail: ModuleDetail,
    pub status: ModuleStatus,
    /// Module that follows this one, if any.
    pub next: Option<ModuleSlug>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Learner-facing progress operations over a catalog and a progress store.
///
/// Clones share the session view.
#[derive(Clone)]
pub struct ProgressService {
    pub(super) clock: Clock,
    pub(super) auth: AuthSession,
    pub(super) catalog: CatalogService,
    pub(super) store: Arc<dyn ProgressRepository>,
    view: Arc<Mutex<SessionView>>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        auth: AuthSession,
        catalog: Arc<dyn CatalogRepository>,
        store: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            auth,
            catalog: CatalogService::new(catalog),
            store,
            view: Arc::new(Mutex::new(SessionView::default())),
        }
    }

    #[must_use]
    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    /// Session view of the learner currently signed in.
    // The guard must be dropped before any await.
    pub(super) fn view(&self) -> MutexGuard<'_, SessionView> {
        self.view_for(&self.auth.identity())
    }

    /// Session view bound to `identity`; whatever was cached for another
    /// identity is discarded first.
    pub(super) fn view_for(&self, identity: &Identity) -> MutexGuard<'_, SessionView> {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        if view.bind(identity) {
            debug!("learner changed, session progress reset");
        }
        view
    }

    /// Completed set for a course, degrading to the session cache when the
    /// store cannot be read.
    pub(super) async fn load_completed(
        &self,
        course: &CourseSlug,
    ) -> (Option<CompletedSet>, Freshness) {
        if !self.auth.is_authenticated() {
            return (None, Freshness::Anonymous);
        }

        match self.store.course_progress(course).await {
            Ok(records) => {
                let merged = self.view().absorb(course, &records);
                debug!(course = %course, completed = merged.len(), "progress refreshed");
                (Some(merged), Freshness::Live)
            }
            Err(err) => {
                let cached = self.view().cached(course);
                warn!(
                    course = %course,
                    error = %err,
                    cached = cached.is_some(),
                    "progress read failed, using session state"
                );
                match cached {
                    Some(set) => (Some(set), Freshness::Cached),
                    None => (None, Freshness::Unknown),
                }
            }
        }
    }

    /// Evaluate every module of a course for the current learner.
    ///
    /// Progress read failures never surface here; see [`Freshness`].
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NotFound` for an unknown course, or
    /// `ProgressError::Unavailable` if the catalog cannot be read.
    pub async fn course_overview(
        &self,
        course: &CourseSlug,
    ) -> Result<CourseProgress, ProgressError> {
        let course = self.catalog.course(course).await?;
        let (completed, freshness) = self.load_completed(course.slug()).await;
        let overview = CourseOverview::new(&course, completed.as_ref());
        Ok(CourseProgress {
            course,
            overview,
            freshness,
        })
    }

    /// Open a module for reading and remember it as the learner's current one.
    ///
    /// Anonymous visitors may preview any module.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Locked` when a signed-in learner has not
    /// completed the previous module, `ProgressError::NotFound` for unknown
    /// slugs.
    pub async fn open_module(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
    ) -> Result<ModuleView, ProgressError> {
        let progress = self.course_overview(course).await?;
        let detail = self.catalog.module(course, module).await?;
        let status = progress
            .overview
            .status(module)
            .cloned()
            .ok_or_else(|| ProgressError::NotFound {
                kind: "module",
                slug: module.to_string(),
            })?;

        if self.auth.is_authenticated() {
            if !status.unlocked
                && let Some(prev) = progress.course.prerequisite_of(module)
            {
                return Err(ProgressError::Locked {
                    module: module.clone(),
                    prerequisite: prev.slug().clone(),
                });
            }
            if let Err(err) = self
                .store
                .mark_current(course, module, self.clock.now())
                .await
            {
                warn!(course = %course, module = %module, error = %err, "failed to remember current module");
            }
        }

        let next = progress.overview.next_module_after(module).cloned();
        Ok(ModuleView {
            detail,
            status,
            next,
        })
    }

    /// Drop everything this session learned about the learner's progress.
    pub fn forget_session(&self) {
        self.view().clear();
        debug!("session progress cleared");
    }
}
