//! Static course catalog loaded from a JSON file.
//!
//! Module content in older catalogs is a list of plain paragraphs while newer
//! ones use titled sections; both are accepted and mapped to
//! [`ContentSection`]. Module order is the position in the `modules` array.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use course_core::model::{
    ContentSection, Course, CourseColor, CourseError, CourseSlug, CourseSummary, ModuleDetail,
    ModuleSlug, ModuleSummary, SlugError,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::repository::{CatalogRepository, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogLoadError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Slug(#[from] SlugError),

    #[error("invalid course {course}: {source}")]
    Course {
        course: String,
        #[source]
        source: CourseError,
    },

    #[error("duplicate course {0}")]
    DuplicateCourse(CourseSlug),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    courses: Vec<RawCourse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCourse {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
    #[serde(default)]
    color: CourseColor,
    #[serde(default)]
    modules: Vec<RawModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModule {
    id: String,
    title: String,
    #[serde(default)]
    objective: String,
    #[serde(default)]
    content: Vec<RawSection>,
    #[serde(default)]
    reflection_questions: Vec<String>,
    #[serde(default)]
    capstone_task: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSection {
    Plain(String),
    Structured {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        points: Vec<String>,
        #[serde(default)]
        examples: Vec<String>,
    },
}

impl From<RawSection> for ContentSection {
    fn from(raw: RawSection) -> Self {
        match raw {
            RawSection::Plain(text) => ContentSection::plain(text),
            RawSection::Structured {
                title,
                description,
                points,
                examples,
            } => ContentSection::structured(title, description, points, examples),
        }
    }
}

/// Read-only catalog held in memory after parsing.
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    courses: Vec<Course>,
    modules: HashMap<(CourseSlug, ModuleSlug), ModuleDetail>,
}

impl JsonCatalog {
    /// Read and parse a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogLoadError` if the file cannot be read or is invalid.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let catalog = Self::parse(&raw)?;
        debug!(
            path = %path.as_ref().display(),
            courses = catalog.courses.len(),
            "loaded course catalog"
        );
        Ok(catalog)
    }

    /// Parse a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `CatalogLoadError` for malformed JSON, bad slugs, or invalid
    /// courses (blank titles, duplicate modules).
    pub fn parse(json: &str) -> Result<Self, CatalogLoadError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::default();

        for raw in file.courses {
            let course_slug = CourseSlug::new(raw.id.as_str())?;
            if catalog.courses.iter().any(|c| c.slug() == &course_slug) {
                return Err(CatalogLoadError::DuplicateCourse(course_slug));
            }
            let invalid = |source: CourseError| CatalogLoadError::Course {
                course: raw.id.clone(),
                source,
            };

            let mut summaries = Vec::with_capacity(raw.modules.len());
            let mut details = Vec::with_capacity(raw.modules.len());
            for (module, order) in raw.modules.into_iter().zip(0_u32..) {
                let summary = ModuleSummary::new(
                    ModuleSlug::new(module.id)?,
                    module.title,
                    module.objective,
                    order,
                    module.capstone_task,
                )
                .map_err(invalid)?;
                let sections = module.content.into_iter().map(Into::into).collect();
                let detail = ModuleDetail::new(summary.clone(), sections, module.reflection_questions)
                    .map_err(invalid)?;
                summaries.push(summary);
                details.push(detail);
            }

            let course = Course::new(
                course_slug.clone(),
                raw.title,
                raw.description,
                raw.icon,
                raw.color,
                summaries,
            )
            .map_err(invalid)?;

            for detail in details {
                catalog
                    .modules
                    .insert((course_slug.clone(), detail.slug().clone()), detail);
            }
            catalog.courses.push(course);
        }

        Ok(catalog)
    }

    #[must_use]
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }
}

#[async_trait]
impl CatalogRepository for JsonCatalog {
    async fn list_courses(&self) -> Result<Vec<CourseSummary>, StorageError> {
        Ok(self.courses.iter().map(Course::summary).collect())
    }

    async fn get_course(&self, course: &CourseSlug) -> Result<Course, StorageError> {
        self.courses
            .iter()
            .find(|c| c.slug() == course)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_module(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
    ) -> Result<ModuleDetail, StorageError> {
        self.modules
            .get(&(course.clone(), module.clone()))
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}
