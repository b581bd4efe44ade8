//! Sequential module unlocking.
//!
//! A module is reachable when it is the first one in its course or when the
//! module right before it is complete. Completion of a module never reaches
//! further than its direct successor, so a gap in the completed set (A and C
//! done, B not) leaves C locked even though its completed flag is kept.

use crate::model::{CompletedSet, Course, ModuleSlug};

/// Display state of a module for the current learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnlockState {
    Locked,
    Unlocked,
    Completed,
}

impl UnlockState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UnlockState::Locked => "locked",
            UnlockState::Unlocked => "unlocked",
            UnlockState::Completed => "completed",
        }
    }
}

/// Evaluated status of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    pub module: ModuleSlug,
    pub index: usize,
    /// The module is in the completed set.
    pub completed: bool,
    /// The module may be entered: first module, or its predecessor is complete.
    pub unlocked: bool,
}

impl ModuleStatus {
    #[must_use]
    pub fn state(&self) -> UnlockState {
        match (self.unlocked, self.completed) {
            (false, _) => UnlockState::Locked,
            (true, true) => UnlockState::Completed,
            (true, false) => UnlockState::Unlocked,
        }
    }
}

/// Computes the status of every module in `modules`, in order.
///
/// `None` means progress is unknown and is treated as nothing completed.
/// Slugs in `completed` that are not part of `modules` are ignored.
#[must_use]
pub fn evaluate(modules: &[ModuleSlug], completed: Option<&CompletedSet>) -> Vec<ModuleStatus> {
    let empty = CompletedSet::new();
    let completed = completed.unwrap_or(&empty);

    modules
        .iter()
        .enumerate()
        .map(|(index, module)| {
            let unlocked = match index.checked_sub(1) {
                None => true,
                Some(prev) => completed.contains(&modules[prev]),
            };
            ModuleStatus {
                module: module.clone(),
                index,
                completed: completed.contains(module),
                unlocked,
            }
        })
        .collect()
}

/// A course's modules evaluated against one completed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOverview {
    statuses: Vec<ModuleStatus>,
}

impl CourseOverview {
    #[must_use]
    pub fn new(course: &Course, completed: Option<&CompletedSet>) -> Self {
        Self::from_modules(&course.module_slugs(), completed)
    }

    #[must_use]
    pub fn from_modules(modules: &[ModuleSlug], completed: Option<&CompletedSet>) -> Self {
        Self {
            statuses: evaluate(modules, completed),
        }
    }

    #[must_use]
    pub fn statuses(&self) -> &[ModuleStatus] {
        &self.statuses
    }

    #[must_use]
    pub fn status(&self, module: &ModuleSlug) -> Option<&ModuleStatus> {
        self.statuses.iter().find(|s| &s.module == module)
    }

    #[must_use]
    pub fn state(&self, module: &ModuleSlug) -> Option<UnlockState> {
        self.status(module).map(ModuleStatus::state)
    }

    /// Unknown modules are reported as locked.
    #[must_use]
    pub fn is_unlocked(&self, module: &ModuleSlug) -> bool {
        self.status(module).is_some_and(|s| s.unlocked)
    }

    #[must_use]
    pub fn is_completed(&self, module: &ModuleSlug) -> bool {
        self.status(module).is_some_and(|s| s.completed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.statuses.len()
    }

    /// Completed modules of this course; stray slugs are not counted.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.completed).count()
    }

    /// Rounded percentage of completed modules, 0 for an empty course.
    #[must_use]
    pub fn completion_percentage(&self) -> u8 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let pct = (self.completed_count() * 200 + total) / (total * 2);
        u8::try_from(pct).unwrap_or(100)
    }

    /// The module after `module`, or `None` when it is the last (course finished)
    /// or unknown.
    #[must_use]
    pub fn next_module_after(&self, module: &ModuleSlug) -> Option<&ModuleSlug> {
        let status = self.status(module)?;
        self.statuses.get(status.index + 1).map(|s| &s.module)
    }

    /// First module the learner can enter but has not completed yet.
    #[must_use]
    pub fn resume_module(&self) -> Option<&ModuleSlug> {
        self.statuses
            .iter()
            .find(|s| s.unlocked && !s.completed)
            .map(|s| &s.module)
    }

    /// Every module of a non-empty course is complete.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.statuses.is_empty() && self.statuses.iter().all(|s| s.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use UnlockState::{Completed, Locked, Unlocked};

    fn slugs(names: &[&str]) -> Vec<ModuleSlug> {
        names.iter().map(|n| ModuleSlug::new(*n).unwrap()).collect()
    }

    fn set(names: &[&str]) -> CompletedSet {
        slugs(names).into_iter().collect()
    }

    fn states(modules: &[ModuleSlug], completed: Option<&CompletedSet>) -> Vec<UnlockState> {
        evaluate(modules, completed)
            .iter()
            .map(ModuleStatus::state)
            .collect()
    }

    #[test]
    fn nothing_completed_unlocks_only_first() {
        let modules = slugs(&["a", "b", "c"]);
        assert_eq!(states(&modules, Some(&set(&[]))), [Unlocked, Locked, Locked]);
    }

    #[test]
    fn unknown_progress_is_conservative() {
        let modules = slugs(&["a", "b", "c"]);
        assert_eq!(states(&modules, None), [Unlocked, Locked, Locked]);
    }

    #[test]
    fn first_completed_unlocks_second() {
        let modules = slugs(&["a", "b", "c"]);
        assert_eq!(
            states(&modules, Some(&set(&["a"]))),
            [Completed, Unlocked, Locked]
        );
    }

    #[test]
    fn gap_does_not_unlock_past_missing_module() {
        let modules = slugs(&["a", "b", "c"]);
        let statuses = evaluate(&modules, Some(&set(&["a", "c"])));
        let states: Vec<_> = statuses.iter().map(ModuleStatus::state).collect();
        assert_eq!(states, [Completed, Unlocked, Locked]);
        assert!(statuses[2].completed);
        assert!(!statuses[2].unlocked);
    }

    #[test]
    fn empty_course_and_stray_slugs() {
        assert!(evaluate(&[], Some(&set(&["a"]))).is_empty());

        let modules = slugs(&["a", "b"]);
        assert_eq!(
            states(&modules, Some(&set(&["zz", "yy"]))),
            [Unlocked, Locked]
        );
    }

    #[test]
    fn unlock_follows_predecessor_for_all_subsets() {
        let modules = slugs(&["a", "b", "c", "d"]);
        for mask in 0_u32..16 {
            let completed: CompletedSet = modules
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, m)| m.clone())
                .collect();
            let statuses = evaluate(&modules, Some(&completed));
            assert_ne!(statuses[0].state(), Locked, "mask {mask}");
            for i in 1..modules.len() {
                let reachable = statuses[i].state() != Locked;
                assert_eq!(reachable, completed.contains(&modules[i - 1]), "mask {mask} i {i}");
            }
        }
    }

    #[test]
    fn overview_percentage_and_navigation() {
        let modules = slugs(&["a", "b", "c"]);
        let overview = CourseOverview::from_modules(&modules, Some(&set(&["a", "zz"])));
        assert_eq!(overview.total(), 3);
        assert_eq!(overview.completed_count(), 1);
        assert_eq!(overview.completion_percentage(), 33);
        assert_eq!(overview.resume_module(), Some(&modules[1]));
        assert_eq!(overview.next_module_after(&modules[0]), Some(&modules[1]));
        assert_eq!(overview.next_module_after(&modules[2]), None);
        assert!(!overview.is_finished());
        assert!(!overview.is_unlocked(&ModuleSlug::new("zz").unwrap()));
    }

    #[test]
    fn overview_rounds_half_up_and_finishes() {
        let modules = slugs(&["a", "b", "c"]);
        let two = CourseOverview::from_modules(&modules, Some(&set(&["a", "b"])));
        assert_eq!(two.completion_percentage(), 67);

        let all = CourseOverview::from_modules(&modules, Some(&set(&["a", "b", "c"])));
        assert_eq!(all.completion_percentage(), 100);
        assert!(all.is_finished());
        assert_eq!(all.resume_module(), None);

        let empty = CourseOverview::from_modules(&[], None);
        assert_eq!(empty.completion_percentage(), 0);
        assert!(!empty.is_finished());
    }
}
