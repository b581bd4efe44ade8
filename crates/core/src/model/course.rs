use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::content::ContentSection;
use crate::model::ids::{CourseSlug, ModuleSlug};
use crate::model::progress::{ReflectionAnswers, ReflectionError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("module title cannot be empty")]
    EmptyModuleTitle,

    #[error("module {0} appears more than once in the course")]
    DuplicateModule(ModuleSlug),

    #[error("reflection question cannot be empty")]
    EmptyPrompt,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// Accent colour used when listing a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseColor {
    #[default]
    Gold,
    Emerald,
    Secondary,
}

/// Catalog listing entry, without the module list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub slug: CourseSlug,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub color: CourseColor,
    pub module_count: usize,
}

/// Module metadata as it appears in a course's ordered module list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    slug: ModuleSlug,
    title: String,
    objective: String,
    order: u32,
    capstone_task: Option<String>,
}

impl ModuleSummary {
    /// # Errors
    ///
    /// Returns `CourseError::EmptyModuleTitle` for a blank title.
    pub fn new(
        slug: ModuleSlug,
        title: impl Into<String>,
        objective: impl Into<String>,
        order: u32,
        capstone_task: Option<String>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyModuleTitle);
        }
        Ok(Self {
            slug,
            title: title.trim().to_owned(),
            objective: objective.into().trim().to_owned(),
            order,
            capstone_task: capstone_task
                .map(|c| c.trim().to_owned())
                .filter(|c| !c.is_empty()),
        })
    }

    #[must_use]
    pub fn slug(&self) -> &ModuleSlug {
        &self.slug
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn objective(&self) -> &str {
        &self.objective
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn capstone_task(&self) -> Option<&str> {
        self.capstone_task.as_deref()
    }
}

/// A course and its modules in unlock order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    slug: CourseSlug,
    title: String,
    description: String,
    icon: String,
    color: CourseColor,
    modules: Vec<ModuleSummary>,
}

impl Course {
    /// Creates a course. Modules are ordered by their `order` field; ties keep
    /// the input order.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` for a blank title and
    /// `CourseError::DuplicateModule` when two modules share a slug.
    pub fn new(
        slug: CourseSlug,
        title: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
        color: CourseColor,
        mut modules: Vec<ModuleSummary>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        let mut seen = HashSet::with_capacity(modules.len());
        for module in &modules {
            if !seen.insert(module.slug()) {
                return Err(CourseError::DuplicateModule(module.slug().clone()));
            }
        }
        modules.sort_by_key(ModuleSummary::order);

        Ok(Self {
            slug,
            title: title.trim().to_owned(),
            description: description.into().trim().to_owned(),
            icon: icon.into(),
            color,
            modules,
        })
    }

    // Accessors
    #[must_use]
    pub fn slug(&self) -> &CourseSlug {
        &self.slug
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn icon(&self) -> &str {
        &self.icon
    }

    #[must_use]
    pub fn color(&self) -> CourseColor {
        self.color
    }

    #[must_use]
    pub fn modules(&self) -> &[ModuleSummary] {
        &self.modules
    }

    /// Module slugs in unlock order.
    #[must_use]
    pub fn module_slugs(&self) -> Vec<ModuleSlug> {
        self.modules.iter().map(|m| m.slug().clone()).collect()
    }

    #[must_use]
    pub fn module_index(&self, slug: &ModuleSlug) -> Option<usize> {
        self.modules.iter().position(|m| m.slug() == slug)
    }

    #[must_use]
    pub fn module(&self, slug: &ModuleSlug) -> Option<&ModuleSummary> {
        self.modules.iter().find(|m| m.slug() == slug)
    }

    /// The module that must be completed before `slug` unlocks.
    ///
    /// `None` for the first module and for slugs outside the course.
    #[must_use]
    pub fn prerequisite_of(&self, slug: &ModuleSlug) -> Option<&ModuleSummary> {
        let index = self.module_index(slug)?;
        index.checked_sub(1).and_then(|prev| self.modules.get(prev))
    }

    /// The module following `slug`, or `None` when `slug` is the last one.
    #[must_use]
    pub fn next_after(&self, slug: &ModuleSlug) -> Option<&ModuleSummary> {
        let index = self.module_index(slug)?;
        self.modules.get(index + 1)
    }

    #[must_use]
    pub fn summary(&self) -> CourseSummary {
        CourseSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            color: self.color,
            module_count: self.modules.len(),
        }
    }
}

//
// ─── MODULE DETAIL ─────────────────────────────────────────────────────────────
//

/// A reflection question, addressed by its position in the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionPrompt {
    index: u32,
    question: String,
}

impl ReflectionPrompt {
    /// # Errors
    ///
    /// Returns `CourseError::EmptyPrompt` for a blank question.
    pub fn new(index: u32, question: impl Into<String>) -> Result<Self, CourseError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(CourseError::EmptyPrompt);
        }
        Ok(Self {
            index,
            question: question.trim().to_owned(),
        })
    }

    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }
}

/// Full module content: the summary plus sections and reflection prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDetail {
    summary: ModuleSummary,
    sections: Vec<ContentSection>,
    prompts: Vec<ReflectionPrompt>,
}

impl ModuleDetail {
    /// Prompts are renumbered by position so answer keys always match.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyPrompt` if any question is blank.
    pub fn new<I, S>(
        summary: ModuleSummary,
        sections: Vec<ContentSection>,
        questions: I,
    ) -> Result<Self, CourseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prompts = questions
            .into_iter()
            .zip(0_u32..)
            .map(|(question, index)| ReflectionPrompt::new(index, question))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            summary,
            sections,
            prompts,
        })
    }

    #[must_use]
    pub fn summary(&self) -> &ModuleSummary {
        &self.summary
    }

    #[must_use]
    pub fn slug(&self) -> &ModuleSlug {
        self.summary.slug()
    }

    #[must_use]
    pub fn sections(&self) -> &[ContentSection] {
        &self.sections
    }

    #[must_use]
    pub fn prompts(&self) -> &[ReflectionPrompt] {
        &self.prompts
    }

    /// Checks that every prompt has a non-blank answer and that no answer
    /// refers to a prompt this module does not have.
    ///
    /// # Errors
    ///
    /// Returns the first `ReflectionError` found, missing answers first.
    pub fn check_answers(&self, answers: &ReflectionAnswers) -> Result<(), ReflectionError> {
        let missing: Vec<u32> = self
            .prompts
            .iter()
            .map(ReflectionPrompt::index)
            .filter(|index| !answers.is_answered(*index))
            .collect();
        if !missing.is_empty() {
            return Err(ReflectionError::Unanswered { missing });
        }

        let prompt_count = u32::try_from(self.prompts.len()).unwrap_or(u32::MAX);
        if let Some(index) = answers.indices().find(|index| *index >= prompt_count) {
            return Err(ReflectionError::UnknownPrompt { index });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(slug: &str, order: u32) -> ModuleSummary {
        ModuleSummary::new(ModuleSlug::new(slug).unwrap(), slug, "", order, None).unwrap()
    }

    fn course(modules: Vec<ModuleSummary>) -> Result<Course, CourseError> {
        Course::new(
            CourseSlug::new("corporate-finance").unwrap(),
            "Corporate Finance",
            "Treasury basics",
            "Briefcase",
            CourseColor::Gold,
            modules,
        )
    }

    #[test]
    fn orders_modules_by_order_field() {
        let course = course(vec![module("b", 1), module("a", 0), module("c", 2)]).unwrap();
        let slugs: Vec<_> = course.modules().iter().map(|m| m.slug().as_str()).collect();
        assert_eq!(slugs, ["a", "b", "c"]);
    }

    #[test]
    fn rejects_duplicate_modules() {
        let err = course(vec![module("a", 0), module("a", 1)]).unwrap_err();
        assert_eq!(err, CourseError::DuplicateModule(ModuleSlug::new("a").unwrap()));
    }

    #[test]
    fn prerequisite_and_next() {
        let course = course(vec![module("a", 0), module("b", 1)]).unwrap();
        let a = ModuleSlug::new("a").unwrap();
        let b = ModuleSlug::new("b").unwrap();
        assert!(course.prerequisite_of(&a).is_none());
        assert_eq!(course.prerequisite_of(&b).map(|m| m.slug()), Some(&a));
        assert_eq!(course.next_after(&a).map(|m| m.slug()), Some(&b));
        assert!(course.next_after(&b).is_none());
        assert!(course.next_after(&ModuleSlug::new("zz").unwrap()).is_none());
    }

    #[test]
    fn capstone_blank_is_none() {
        let m = ModuleSummary::new(ModuleSlug::new("a").unwrap(), "A", "", 0, Some("  ".into()))
            .unwrap();
        assert_eq!(m.capstone_task(), None);
    }

    #[test]
    fn check_answers_requires_every_prompt() {
        let detail = ModuleDetail::new(module("a", 0), vec![], ["Why?", "How?"]).unwrap();

        let mut answers = ReflectionAnswers::new();
        answers.insert(0, "Because");
        answers.insert(1, "   ");
        assert_eq!(
            detail.check_answers(&answers).unwrap_err(),
            ReflectionError::Unanswered { missing: vec![1] }
        );

        answers.insert(1, "Carefully");
        assert!(detail.check_answers(&answers).is_ok());

        answers.insert(7, "extra");
        assert_eq!(
            detail.check_answers(&answers).unwrap_err(),
            ReflectionError::UnknownPrompt { index: 7 }
        );
    }

    #[test]
    fn module_without_prompts_accepts_empty_answers() {
        let detail = ModuleDetail::new(module("a", 0), vec![], Vec::<String>::new()).unwrap();
        assert!(detail.check_answers(&ReflectionAnswers::new()).is_ok());
    }
}
