use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::UnlockState;
use course_core::model::{
    ContentSection, Course, CourseColor, CourseSlug, ModuleDetail, ModuleSlug, ModuleSummary,
    ProgressRecord, ReflectionAnswers,
};
use course_core::time::fixed_now;
use services::{AuthSession, AuthToken, Clock, Freshness, NextStep, ProgressError, ProgressService};
use storage::repository::{CompletionRequest, InMemoryRepository, ProgressRepository, StorageError};

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

fn course_slug() -> CourseSlug {
    CourseSlug::new("corporate-finance").unwrap()
}

fn m(slug: &str) -> ModuleSlug {
    ModuleSlug::new(slug).unwrap()
}

fn answers(texts: &[&str]) -> ReflectionAnswers {
    texts.iter().copied().collect()
}

/// Catalog with modules a, b, c; each has one reflection prompt.
fn catalog() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    let summaries: Vec<ModuleSummary> = ["a", "b", "c"]
        .into_iter()
        .zip(0_u32..)
        .map(|(slug, order)| {
            ModuleSummary::new(m(slug), format!("Module {slug}"), "", order, None).unwrap()
        })
        .collect();

    for summary in &summaries {
        let detail = ModuleDetail::new(
            summary.clone(),
            vec![ContentSection::plain("Read this.")],
            ["What did you learn?"],
        )
        .unwrap();
        repo.upsert_module(&course_slug(), detail).unwrap();
    }
    repo.upsert_course(
        Course::new(
            course_slug(),
            "Corporate Finance",
            "Treasury basics",
            "🏦",
            CourseColor::Gold,
            summaries,
        )
        .unwrap(),
    )
    .unwrap();
    repo
}

/// Progress store whose reads and writes can be made to fail.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: InMemoryRepository,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    /// Reads stop seeing completed writes, like a lagging replica.
    lagging: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    seeded: Arc<Mutex<Vec<ProgressRecord>>>,
}

impl FlakyStore {
    fn seed(&self, module: &str) {
        self.seeded.lock().unwrap().push(ProgressRecord::completed(
            course_slug(),
            m(module),
            fixed_now(),
            answers(&["seeded"]),
        ));
    }

    fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressRepository for FlakyStore {
    async fn course_progress(
        &self,
        course: &CourseSlug,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("backend unreachable".into()));
        }
        let mut records = if self.lagging.load(Ordering::SeqCst) {
            Vec::new()
        } else {
            self.inner.course_progress(course).await?
        };
        let seeded = self.seeded.lock().unwrap().clone();
        records.extend(seeded.into_iter().filter(|r| r.course() == course));
        Ok(records)
    }

    async fn record_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<ProgressRecord, StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("timed out".into()));
        }
        self.inner.record_completion(request).await
    }

    async fn mark_current(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.inner.mark_current(course, module, at).await
    }
}

fn service(auth: AuthSession, store: &FlakyStore) -> ProgressService {
    ProgressService::new(
        Clock::fixed(fixed_now()),
        auth,
        Arc::new(catalog()),
        Arc::new(store.clone()),
    )
}

fn signed_in() -> AuthSession {
    AuthSession::with_token(AuthToken::new("learner-token"))
}

fn states(progress: &services::CourseProgress) -> Vec<UnlockState> {
    progress
        .overview
        .statuses()
        .iter()
        .map(|s| s.state())
        .collect()
}

//
// ─── COMPLETION ────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn anonymous_completion_never_reaches_the_store() {
    let store = FlakyStore::default();
    let svc = service(AuthSession::anonymous(), &store);

    let err = svc
        .complete_module(&course_slug(), &m("a"), answers(&["x"]))
        .await
        .unwrap_err();

    assert!(matches!(err, ProgressError::Unauthorized));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn completing_in_order_walks_to_the_end() {
    let store = FlakyStore::default();
    let svc = service(signed_in(), &store);

    let first = svc
        .complete_module(&course_slug(), &m("a"), answers(&["Cash is king"]))
        .await
        .unwrap();
    assert_eq!(first.next, NextStep::Module(m("b")));
    assert_eq!(first.record.completed_at(), Some(fixed_now()));
    assert_eq!(first.overview.completion_percentage(), 33);

    let second = svc
        .complete_module(&course_slug(), &m("b"), answers(&["Hedge FX"]))
        .await
        .unwrap();
    assert_eq!(second.next, NextStep::Module(m("c")));

    let last = svc
        .complete_module(&course_slug(), &m("c"), answers(&["Write the memo"]))
        .await
        .unwrap();
    assert_eq!(last.next, NextStep::CourseFinished);
    assert!(last.overview.is_finished());
    assert_eq!(last.overview.completion_percentage(), 100);
}

#[tokio::test]
async fn skipping_ahead_is_locked() {
    let store = FlakyStore::default();
    let svc = service(signed_in(), &store);

    let err = svc
        .complete_module(&course_slug(), &m("c"), answers(&["x"]))
        .await
        .unwrap_err();

    match err {
        ProgressError::Locked {
            module,
            prerequisite,
        } => {
            assert_eq!(module, m("c"));
            assert_eq!(prerequisite, m("b"));
        }
        other => panic!("expected Locked, got {other:?}"),
    }
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn completing_twice_returns_the_first_record() {
    let store = FlakyStore::default();
    let svc = service(signed_in(), &store);

    let first = svc
        .complete_module(&course_slug(), &m("a"), answers(&["first"]))
        .await
        .unwrap();
    let again = svc
        .complete_module(&course_slug(), &m("a"), answers(&["second"]))
        .await
        .unwrap();

    assert_eq!(first.record, again.record);
    assert_eq!(again.record.answers().get(0), Some("first"));
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn blank_answers_are_rejected_before_writing() {
    let store = FlakyStore::default();
    let svc = service(signed_in(), &store);

    let err = svc
        .complete_module(&course_slug(), &m("a"), answers(&["   "]))
        .await
        .unwrap_err();

    assert!(matches!(err, ProgressError::Validation(_)));
    assert!(!err.is_retryable());
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_write_changes_nothing() {
    let store = FlakyStore::default();
    store.fail_writes.store(true, Ordering::SeqCst);
    let svc = service(signed_in(), &store);

    let err = svc
        .complete_module(&course_slug(), &m("a"), answers(&["x"]))
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let progress = svc.course_overview(&course_slug()).await.unwrap();
    assert_eq!(
        states(&progress),
        [UnlockState::Unlocked, UnlockState::Locked, UnlockState::Locked]
    );

    store.fail_writes.store(false, Ordering::SeqCst);
    let retried = svc
        .complete_module(&course_slug(), &m("a"), answers(&["x"]))
        .await
        .unwrap();
    assert_eq!(retried.next, NextStep::Module(m("b")));
}

#[tokio::test]
async fn unknown_course_is_not_found() {
    let store = FlakyStore::default();
    let svc = service(signed_in(), &store);

    let err = svc
        .complete_module(&CourseSlug::new("mining").unwrap(), &m("a"), answers(&["x"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::NotFound { kind: "course", .. }));
}

//
// ─── OVERVIEW ──────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn anonymous_overview_unlocks_only_the_first_module() {
    let store = FlakyStore::default();
    store.seed("a");
    let svc = service(AuthSession::anonymous(), &store);

    let progress = svc.course_overview(&course_slug()).await.unwrap();

    assert_eq!(progress.freshness, Freshness::Anonymous);
    assert_eq!(
        states(&progress),
        [UnlockState::Unlocked, UnlockState::Locked, UnlockState::Locked]
    );
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn gap_in_progress_keeps_later_module_locked() {
    let store = FlakyStore::default();
    store.seed("a");
    store.seed("c");
    let svc = service(signed_in(), &store);

    let progress = svc.course_overview(&course_slug()).await.unwrap();
    assert_eq!(
        states(&progress),
        [
            UnlockState::Completed,
            UnlockState::Unlocked,
            UnlockState::Locked
        ]
    );
    assert!(progress.overview.is_completed(&m("c")));
    assert_eq!(progress.overview.completion_percentage(), 67);

    let err = svc.open_module(&course_slug(), &m("c")).await.unwrap_err();
    assert!(matches!(err, ProgressError::Locked { .. }));
}

#[tokio::test]
async fn read_failure_falls_back_to_session_state() {
    let store = FlakyStore::default();
    let svc = service(signed_in(), &store);
    svc.complete_module(&course_slug(), &m("a"), answers(&["x"]))
        .await
        .unwrap();

    store.fail_reads.store(true, Ordering::SeqCst);
    let progress = svc.course_overview(&course_slug()).await.unwrap();
    assert_eq!(progress.freshness, Freshness::Cached);
    assert_eq!(
        states(&progress),
        [
            UnlockState::Completed,
            UnlockState::Unlocked,
            UnlockState::Locked
        ]
    );

    svc.forget_session();
    let progress = svc.course_overview(&course_slug()).await.unwrap();
    assert_eq!(progress.freshness, Freshness::Unknown);
    assert_eq!(progress.overview.completed_count(), 0);
    assert!(progress.overview.is_unlocked(&m("a")));
}

#[tokio::test]
async fn stale_read_does_not_relock_completed_modules() {
    let store = FlakyStore::default();
    let svc = service(signed_in(), &store);
    svc.complete_module(&course_slug(), &m("a"), answers(&["x"]))
        .await
        .unwrap();

    store.lagging.store(true, Ordering::SeqCst);
    let progress = svc.course_overview(&course_slug()).await.unwrap();
    assert_eq!(progress.freshness, Freshness::Live);
    assert!(progress.overview.is_completed(&m("a")));
    assert!(progress.overview.is_unlocked(&m("b")));
}

//
// ─── OPENING MODULES ───────────────────────────────────────────────────────────
//

#[tokio::test]
async fn opening_a_module_marks_it_current() {
    let store = FlakyStore::default();
    let svc = service(signed_in(), &store);

    let view = svc.open_module(&course_slug(), &m("a")).await.unwrap();
    assert_eq!(view.status.state(), UnlockState::Unlocked);
    assert_eq!(view.next, Some(m("b")));
    assert_eq!(view.detail.prompts().len(), 1);
    assert_eq!(
        store.inner.current_module(&course_slug()).unwrap(),
        Some(m("a"))
    );
}

#[tokio::test]
async fn anonymous_visitors_may_preview_locked_modules() {
    let store = FlakyStore::default();
    let svc = service(AuthSession::anonymous(), &store);

    let view = svc.open_module(&course_slug(), &m("c")).await.unwrap();
    assert_eq!(view.status.state(), UnlockState::Locked);
    assert_eq!(view.next, None);
    assert_eq!(store.inner.current_module(&course_slug()).unwrap(), None);
}

#[tokio::test]
async fn signing_out_stops_completions() {
    let store = FlakyStore::default();
    let auth = signed_in();
    let svc = service(auth.clone(), &store);
    svc.complete_module(&course_slug(), &m("a"), answers(&["x"]))
        .await
        .unwrap();

    auth.sign_out();
    let err = svc
        .complete_module(&course_slug(), &m("b"), answers(&["x"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::Unauthorized));
}

#[tokio::test]
async fn next_learner_does_not_inherit_completions() {
    let store = FlakyStore::default();
    let auth = signed_in();
    let svc = service(auth.clone(), &store);
    svc.complete_module(&course_slug(), &m("a"), answers(&["x"]))
        .await
        .unwrap();

    // The second learner has nothing stored.
    store.lagging.store(true, Ordering::SeqCst);
    auth.sign_out();
    auth.sign_in(AuthToken::new("other-learner").unwrap());

    let progress = svc.course_overview(&course_slug()).await.unwrap();
    assert_eq!(progress.freshness, Freshness::Live);
    assert_eq!(
        states(&progress),
        [UnlockState::Unlocked, UnlockState::Locked, UnlockState::Locked]
    );

    let err = svc
        .complete_module(&course_slug(), &m("b"), answers(&["x"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressError::Locked { .. }));
}
