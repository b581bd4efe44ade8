//! Wire shapes of the course backend and their mapping into domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use course_core::model::{
    ContentSection, Course, CourseColor, CourseSlug, CourseSummary, ModuleDetail, ModuleSlug,
    ModuleSummary, ProgressRecord, ReflectionAnswers,
};
use serde::{Deserialize, Serialize};
use storage::StorageError;

fn invalid<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseListItemDto {
    slug: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    color: CourseColor,
    #[serde(default)]
    module_count: usize,
}

impl CourseListItemDto {
    pub(crate) fn into_domain(self) -> Result<CourseSummary, StorageError> {
        Ok(CourseSummary {
            slug: CourseSlug::new(self.slug).map_err(invalid)?,
            title: self.title,
            description: self.description,
            icon: self.icon,
            color: self.color,
            module_count: self.module_count,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModuleListItemDto {
    slug: String,
    title: String,
    #[serde(default)]
    objective: String,
    #[serde(default)]
    order: u32,
    #[serde(default)]
    capstone_task: Option<String>,
}

impl ModuleListItemDto {
    fn into_domain(self) -> Result<ModuleSummary, StorageError> {
        ModuleSummary::new(
            ModuleSlug::new(self.slug).map_err(invalid)?,
            self.title,
            self.objective,
            self.order,
            self.capstone_task,
        )
        .map_err(invalid)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseDetailDto {
    slug: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    color: CourseColor,
    #[serde(default)]
    modules: Vec<ModuleListItemDto>,
}

impl CourseDetailDto {
    pub(crate) fn into_domain(self) -> Result<Course, StorageError> {
        let modules = self
            .modules
            .into_iter()
            .map(ModuleListItemDto::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Course::new(
            CourseSlug::new(self.slug).map_err(invalid)?,
            self.title,
            self.description,
            self.icon,
            self.color,
            modules,
        )
        .map_err(invalid)
    }
}

/// A bullet line: either a bare string or an ordered object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LineDto {
    Text(String),
    Item {
        text: String,
        #[serde(default)]
        order: u32,
    },
}

fn ordered_lines(lines: Vec<LineDto>) -> Vec<String> {
    let mut keyed: Vec<(u32, String)> = lines
        .into_iter()
        .zip(0_u32..)
        .map(|(line, position)| match line {
            LineDto::Text(text) => (position, text),
            LineDto::Item { text, order } => (order, text),
        })
        .collect();
    keyed.sort_by_key(|(order, _)| *order);
    keyed.into_iter().map(|(_, text)| text).collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SectionDto {
    Plain(String),
    Structured {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        order: u32,
        #[serde(default)]
        points: Vec<LineDto>,
        #[serde(default)]
        examples: Vec<LineDto>,
    },
}

#[derive(Debug, Deserialize)]
struct QuestionDto {
    question: String,
    #[serde(default)]
    order: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModuleDetailDto {
    #[serde(flatten)]
    summary: ModuleListItemDto,
    #[serde(default)]
    content_sections: Vec<SectionDto>,
    #[serde(default)]
    reflection_questions: Vec<QuestionDto>,
}

impl ModuleDetailDto {
    pub(crate) fn into_domain(self) -> Result<ModuleDetail, StorageError> {
        let summary = self.summary.into_domain()?;

        let mut sections: Vec<(u32, ContentSection)> = self
            .content_sections
            .into_iter()
            .zip(0_u32..)
            .map(|(section, position)| match section {
                SectionDto::Plain(text) => (position, ContentSection::plain(text)),
                SectionDto::Structured {
                    title,
                    description,
                    order,
                    points,
                    examples,
                } => (
                    order,
                    ContentSection::structured(
                        title,
                        description,
                        ordered_lines(points),
                        ordered_lines(examples),
                    ),
                ),
            })
            .collect();
        sections.sort_by_key(|(order, _)| *order);

        let mut questions = self.reflection_questions;
        questions.sort_by_key(|q| q.order);

        ModuleDetail::new(
            summary,
            sections.into_iter().map(|(_, s)| s).collect(),
            questions.into_iter().map(|q| q.question),
        )
        .map_err(invalid)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserProgressDto {
    module_slug: String,
    course_slug: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reflection_answers: BTreeMap<String, String>,
}

impl UserProgressDto {
    /// Answer keys that are not prompt indices are dropped.
    pub(crate) fn into_domain(self, now: DateTime<Utc>) -> Result<ProgressRecord, StorageError> {
        let mut answers = ReflectionAnswers::new();
        for (key, answer) in self.reflection_answers {
            if let Ok(index) = key.trim().parse::<u32>() {
                answers.insert(index, answer);
            }
        }
        Ok(ProgressRecord::from_persisted(
            CourseSlug::new(self.course_slug).map_err(invalid)?,
            ModuleSlug::new(self.module_slug).map_err(invalid)?,
            self.completed,
            self.completed_at,
            answers,
            now,
        ))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CompleteModuleBody<'a> {
    pub course_slug: &'a str,
    pub module_slug: &'a str,
    pub reflection_answers: &'a ReflectionAnswers,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
