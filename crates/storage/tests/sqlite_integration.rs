use chrono::Duration;
use course_core::model::{CourseSlug, ModuleSlug, ReflectionAnswers};
use course_core::time::fixed_now;
use storage::repository::{CompletionRequest, ProgressRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn course() -> CourseSlug {
    CourseSlug::new("corporate-finance").unwrap()
}

fn module(s: &str) -> ModuleSlug {
    ModuleSlug::new(s).unwrap()
}

fn request(m: &str, prerequisite: Option<&str>) -> CompletionRequest {
    CompletionRequest {
        course: course(),
        module: module(m),
        prerequisite: prerequisite.map(module),
        answers: ["inflation ate our savings"].into_iter().collect(),
        requested_at: fixed_now(),
    }
}

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_records_completions_in_sequence() {
    let repo = repo("memdb_sequence").await;

    let first = repo.record_completion(&request("mod-1", None)).await.unwrap();
    assert_eq!(first.completed_at(), Some(fixed_now()));
    assert_eq!(first.answers().get(0), Some("inflation ate our savings"));

    repo.record_completion(&request("mod-2", Some("mod-1")))
        .await
        .unwrap();

    let records = repo.course_progress(&course()).await.unwrap();
    let slugs: Vec<_> = records.iter().map(|r| r.module().as_str()).collect();
    assert_eq!(slugs, ["mod-1", "mod-2"]);
}

#[tokio::test]
async fn sqlite_refuses_skipping_a_module() {
    let repo = repo("memdb_skip").await;

    let err = repo
        .record_completion(&request("mod-2", Some("mod-1")))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));
    assert!(repo.course_progress(&course()).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_recompletion_is_a_no_op() {
    let repo = repo("memdb_idempotent").await;
    let first = repo.record_completion(&request("mod-1", None)).await.unwrap();

    let mut later = request("mod-1", None);
    later.requested_at = fixed_now() + Duration::days(3);
    later.answers = ReflectionAnswers::new();
    let second = repo.record_completion(&later).await.unwrap();

    assert_eq!(first, second);
    let doc = repo.load_progress(&course()).await.unwrap().unwrap();
    assert_eq!(doc.completed_modules.len(), 1);
    assert_eq!(doc.last_accessed_at, fixed_now());
}

#[tokio::test]
async fn sqlite_mark_current_creates_document() {
    let repo = repo("memdb_current").await;
    repo.mark_current(&course(), &module("mod-2"), fixed_now())
        .await
        .unwrap();

    let doc = repo.load_progress(&course()).await.unwrap().unwrap();
    assert_eq!(doc.current_module, Some(module("mod-2")));
    assert_eq!(doc.started_at, fixed_now());
    assert!(doc.completed_modules.is_empty());
}

#[tokio::test]
async fn sqlite_unknown_course_has_no_progress() {
    let repo = repo("memdb_empty").await;
    let records = repo
        .course_progress(&CourseSlug::new("mining").unwrap())
        .await
        .unwrap();
    assert!(records.is_empty());
}
