use std::collections::HashMap;

use course_core::model::{CompletedSet, CourseSlug, ModuleSlug, ProgressRecord};

use crate::auth::Identity;

#[derive(Debug, Default, Clone)]
struct CourseEntry {
    completed: CompletedSet,
    records: HashMap<ModuleSlug, ProgressRecord>,
}

/// Per-session knowledge of what the learner has completed.
///
/// Only ever grows until cleared or handed to another identity: fresh reads
/// are merged in, never replace, so a module completed during this session
/// cannot flip back to incomplete because of a stale read.
#[derive(Debug, Default)]
pub(crate) struct SessionView {
    owner: Option<Identity>,
    courses: HashMap<CourseSlug, CourseEntry>,
}

impl SessionView {
    /// Tie the view to `identity`, dropping what was learned for anyone else.
    /// Returns `true` when the view was reset.
    pub(crate) fn bind(&mut self, identity: &Identity) -> bool {
        if self.owner.as_ref() == Some(identity) {
            return false;
        }
        let reset = self.owner.is_some() && !self.courses.is_empty();
        self.courses.clear();
        self.owner = Some(identity.clone());
        reset
    }

    /// Merge a store read into the view and return the resulting set.
    pub(crate) fn absorb(&mut self, course: &CourseSlug, records: &[ProgressRecord]) -> CompletedSet {
        let entry = self.courses.entry(course.clone()).or_default();
        for record in records.iter().filter(|r| r.is_completed()) {
            entry.completed.insert(record.module().clone());
            entry
                .records
                .entry(record.module().clone())
                .or_insert_with(|| record.clone());
        }
        entry.completed.clone()
    }

    /// Add a confirmed completion and return the course's updated set.
    pub(crate) fn record(&mut self, record: &ProgressRecord) -> CompletedSet {
        self.absorb(record.course(), std::slice::from_ref(record))
    }

    pub(crate) fn cached(&self, course: &CourseSlug) -> Option<CompletedSet> {
        self.courses.get(course).map(|entry| entry.completed.clone())
    }

    pub(crate) fn completed_record(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
    ) -> Option<ProgressRecord> {
        self.courses.get(course)?.records.get(module).cloned()
    }

    pub(crate) fn clear(&mut self) {
        self.owner = None;
        self.courses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::time::fixed_now;

    fn done(module: &str) -> ProgressRecord {
        ProgressRecord::completed(
            CourseSlug::new("c").unwrap(),
            ModuleSlug::new(module).unwrap(),
            fixed_now(),
            ["ok"].into_iter().collect(),
        )
    }

    #[test]
    fn stale_read_does_not_drop_completions() {
        let course = CourseSlug::new("c").unwrap();
        let mut view = SessionView::default();
        view.record(&done("a"));
        view.record(&done("b"));

        let merged = view.absorb(&course, &[done("a")]);
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&ModuleSlug::new("b").unwrap()));
    }

    #[test]
    fn pending_records_are_ignored() {
        let course = CourseSlug::new("c").unwrap();
        let mut view = SessionView::default();
        let pending = ProgressRecord::pending(course.clone(), ModuleSlug::new("a").unwrap());
        assert!(view.absorb(&course, &[pending]).is_empty());
        assert!(
            view.completed_record(&course, &ModuleSlug::new("a").unwrap())
                .is_none()
        );
    }

    #[test]
    fn switching_identity_drops_cached_progress() {
        let course = CourseSlug::new("c").unwrap();
        let first = Identity::Token(crate::auth::AuthToken::new("one").unwrap());
        let second = Identity::Token(crate::auth::AuthToken::new("two").unwrap());
        let mut view = SessionView::default();

        assert!(!view.bind(&first));
        view.record(&done("a"));
        assert!(!view.bind(&first));
        assert_eq!(view.cached(&course).map(|s| s.len()), Some(1));

        assert!(view.bind(&second));
        assert!(view.cached(&course).is_none());
    }

    #[test]
    fn clear_forgets_everything() {
        let mut view = SessionView::default();
        view.record(&done("a"));
        view.clear();
        assert!(view.cached(&CourseSlug::new("c").unwrap()).is_none());
    }
}
