//! Offline progress snapshot, one JSON document per course.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use course_core::model::{
    CompletedSet, CourseSlug, ModuleSlug, ProgressRecord, ReflectionAnswers,
};
use serde::{Deserialize, Serialize};

/// Key prefix for per-course progress documents, shared with documents
/// exported from the browser client.
pub const PROGRESS_KEY_PREFIX: &str = "bfpa_progress_";

/// Namespaced storage key for a course's progress document.
#[must_use]
pub fn progress_key(course: &CourseSlug) -> String {
    format!("{PROGRESS_KEY_PREFIX}{course}")
}

/// Completion details kept next to the completed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalCompletion {
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub reflection_answers: ReflectionAnswers,
}

/// Persisted shape of a learner's progress through one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalCourseProgress {
    pub completed_modules: Vec<ModuleSlug>,
    pub current_module: Option<ModuleSlug>,
    pub started_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Absent in documents written before completions were tracked.
    #[serde(default)]
    pub completions: BTreeMap<ModuleSlug, LocalCompletion>,
}

impl LocalCourseProgress {
    #[must_use]
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            completed_modules: Vec::new(),
            current_module: None,
            started_at: now,
            last_accessed_at: now,
            completions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn completed_set(&self) -> CompletedSet {
        self.completed_modules.iter().cloned().collect()
    }

    #[must_use]
    pub fn is_completed(&self, module: &ModuleSlug) -> bool {
        self.completed_modules.contains(module)
    }

    /// Appends a completion. Returns false (and changes nothing) when the
    /// module was already complete.
    pub fn complete(
        &mut self,
        module: &ModuleSlug,
        answers: ReflectionAnswers,
        now: DateTime<Utc>,
    ) -> bool {
        if self.is_completed(module) {
            return false;
        }
        self.completed_modules.push(module.clone());
        self.completions.insert(
            module.clone(),
            LocalCompletion {
                completed_at: now,
                reflection_answers: answers,
            },
        );
        self.last_accessed_at = now;
        true
    }

    pub fn open(&mut self, module: &ModuleSlug, now: DateTime<Utc>) {
        self.current_module = Some(module.clone());
        self.last_accessed_at = now;
    }

    /// Record view of a completed module. Modules completed by older
    /// documents without details fall back to `last_accessed_at`.
    #[must_use]
    pub fn record(&self, course: &CourseSlug, module: &ModuleSlug) -> Option<ProgressRecord> {
        if !self.is_completed(module) {
            return None;
        }
        let details = self.completions.get(module);
        Some(ProgressRecord::from_persisted(
            course.clone(),
            module.clone(),
            true,
            details.map(|d| d.completed_at),
            details
                .map(|d| d.reflection_answers.clone())
                .unwrap_or_default(),
            self.last_accessed_at,
        ))
    }

    #[must_use]
    pub fn records(&self, course: &CourseSlug) -> Vec<ProgressRecord> {
        self.completed_modules
            .iter()
            .filter_map(|module| self.record(course, module))
            .collect()
    }
}
