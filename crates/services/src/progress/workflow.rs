use course_core::CourseOverview;
use course_core::model::{Course, CourseSlug, ModuleSlug, ProgressRecord, ReflectionAnswers};
use storage::repository::{CompletionRequest, StorageError};
use tracing::{info, warn};

use super::service::ProgressService;
use crate::auth::Identity;
use crate::error::ProgressError;

/// Where the learner goes after completing a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    Module(ModuleSlug),
    CourseFinished,
}

/// Result of a confirmed (or already recorded) module completion.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub record: ProgressRecord,
    pub next: NextStep,
    /// Course re-evaluated with the completion applied.
    pub overview: CourseOverview,
}

fn next_step(overview: &CourseOverview, module: &ModuleSlug) -> NextStep {
    overview
        .next_module_after(module)
        .map_or(NextStep::CourseFinished, |next| NextStep::Module(next.clone()))
}

impl ProgressService {
    /// Complete a module with the learner's reflection answers.
    ///
    /// Answers are keyed by the 0-based position of the prompt they answer.
    /// Session state only changes once the store has confirmed the write;
    /// completing a module twice returns the first record.
    ///
    /// # Errors
    ///
    /// - `ProgressError::Unauthorized` when no learner is signed in; the
    ///   store is not contacted.
    /// - `ProgressError::NotFound` for unknown slugs.
    /// - `ProgressError::Validation` for missing or unknown answers.
    /// - `ProgressError::Locked` when the previous module is not complete.
    /// - `ProgressError::Service` when the write fails; safe to retry.
    pub async fn complete_module(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
        answers: ReflectionAnswers,
    ) -> Result<CompletionOutcome, ProgressError> {
        let identity = self.auth.identity();
        if identity == Identity::Anonymous {
            return Err(ProgressError::Unauthorized);
        }

        let course = self.catalog.course(course).await?;
        let detail = self.catalog.module(course.slug(), module).await?;
        detail.check_answers(&answers)?;

        let (completed, _) = self.load_completed(course.slug()).await;
        let overview = CourseOverview::new(&course, completed.as_ref());

        let existing = self.view_for(&identity).completed_record(course.slug(), module);
        if let Some(record) = existing {
            return Ok(CompletionOutcome {
                next: next_step(&overview, module),
                record,
                overview,
            });
        }

        let prerequisite = course.prerequisite_of(module).map(|m| m.slug().clone());
        if let Some(prev) = &prerequisite
            && !overview.is_completed(prev)
        {
            return Err(ProgressError::Locked {
                module: module.clone(),
                prerequisite: prev.clone(),
            });
        }

        let request = CompletionRequest {
            course: course.slug().clone(),
            module: module.clone(),
            prerequisite,
            answers,
            requested_at: self.clock.now(),
        };
        let record = self.store.record_completion(&request).await.map_err(|err| {
            warn!(course = %request.course, module = %module, error = %err, "completion not saved");
            locked_or(err, &request)
        })?;
        if !record.is_completed() {
            return Err(ProgressError::Service(StorageError::Serialization(
                "store did not confirm the completion".into(),
            )));
        }

        Ok(self.apply(&identity, &course, module, record))
    }

    fn apply(
        &self,
        identity: &Identity,
        course: &Course,
        module: &ModuleSlug,
        record: ProgressRecord,
    ) -> CompletionOutcome {
        let completed = self.view_for(identity).record(&record);
        let overview = CourseOverview::new(course, Some(&completed));
        let next = next_step(&overview, module);
        info!(
            course = %course.slug(),
            module = %module,
            progress = overview.completion_percentage(),
            finished = matches!(next, NextStep::CourseFinished),
            "module completed"
        );
        CompletionOutcome {
            record,
            next,
            overview,
        }
    }
}

/// Store-side refusals map onto the same errors as the local checks.
fn locked_or(err: StorageError, request: &CompletionRequest) -> ProgressError {
    match (err, &request.prerequisite) {
        (StorageError::Conflict(_), Some(prev)) => ProgressError::Locked {
            module: request.module.clone(),
            prerequisite: prev.clone(),
        },
        (StorageError::NotFound, _) => ProgressError::NotFound {
            kind: "module",
            slug: request.module.to_string(),
        },
        (other, _) => other.into(),
    }
}
