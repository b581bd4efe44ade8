use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseSlug, ModuleSlug};

//
// ─── REFLECTION ANSWERS ────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReflectionError {
    #[error("reflection questions left unanswered: {missing:?}")]
    Unanswered { missing: Vec<u32> },

    #[error("answer given for unknown reflection question {index}")]
    UnknownPrompt { index: u32 },
}

/// Free-text answers keyed by reflection prompt position.
///
/// Serializes as a JSON object with stringified indices, e.g. `{"0": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReflectionAnswers(BTreeMap<u32, String>);

impl ReflectionAnswers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the answer for a prompt, replacing any previous one.
    pub fn insert(&mut self, index: u32, answer: impl Into<String>) {
        self.0.insert(index, answer.into());
    }

    #[must_use]
    pub fn get(&self, index: u32) -> Option<&str> {
        self.0.get(&index).map(String::as_str)
    }

    /// True when the prompt has an answer that is not just whitespace.
    #[must_use]
    pub fn is_answered(&self, index: u32) -> bool {
        self.get(index).is_some_and(|a| !a.trim().is_empty())
    }

    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ReflectionAnswers {
    /// Collects answers in prompt order.
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(
            (0_u32..)
                .zip(iter)
                .map(|(index, answer)| (index, answer.into()))
                .collect(),
        )
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// A learner's progress on one module of one course.
///
/// Completion is monotonic: once `completed` is set, the timestamp and
/// answers are frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    course: CourseSlug,
    module: ModuleSlug,
    completed_at: Option<DateTime<Utc>>,
    answers: ReflectionAnswers,
}

impl ProgressRecord {
    /// A record for a module the learner has not finished yet.
    #[must_use]
    pub fn pending(course: CourseSlug, module: ModuleSlug) -> Self {
        Self {
            course,
            module,
            completed_at: None,
            answers: ReflectionAnswers::new(),
        }
    }

    #[must_use]
    pub fn completed(
        course: CourseSlug,
        module: ModuleSlug,
        completed_at: DateTime<Utc>,
        answers: ReflectionAnswers,
    ) -> Self {
        Self {
            course,
            module,
            completed_at: Some(completed_at),
            answers,
        }
    }

    /// Rehydrates a record from a store.
    ///
    /// Stores may report `completed` without a timestamp; `fallback_time`
    /// fills the gap so a completed record always carries one.
    #[must_use]
    pub fn from_persisted(
        course: CourseSlug,
        module: ModuleSlug,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
        answers: ReflectionAnswers,
        fallback_time: DateTime<Utc>,
    ) -> Self {
        let completed_at = if completed {
            Some(completed_at.unwrap_or(fallback_time))
        } else {
            None
        };
        Self {
            course,
            module,
            completed_at,
            answers,
        }
    }

    #[must_use]
    pub fn course(&self) -> &CourseSlug {
        &self.course
    }

    #[must_use]
    pub fn module(&self) -> &ModuleSlug {
        &self.module
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn answers(&self) -> &ReflectionAnswers {
        &self.answers
    }
}

//
// ─── COMPLETED SET ─────────────────────────────────────────────────────────────
//

/// Modules known to be complete for one course.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletedSet(BTreeSet<ModuleSlug>);

impl CompletedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from store records, keeping only completed ones.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ProgressRecord>) -> Self {
        Self(
            records
                .into_iter()
                .filter(|r| r.is_completed())
                .map(|r| r.module().clone())
                .collect(),
        )
    }

    #[must_use]
    pub fn contains(&self, module: &ModuleSlug) -> bool {
        self.0.contains(module)
    }

    /// Returns true when the module was not already present.
    pub fn insert(&mut self, module: ModuleSlug) -> bool {
        self.0.insert(module)
    }

    /// Adds everything from `other`. Nothing is ever removed.
    pub fn merge(&mut self, other: &CompletedSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleSlug> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ModuleSlug> for CompletedSet {
    fn from_iter<T: IntoIterator<Item = ModuleSlug>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
