use std::sync::Arc;

use course_core::model::{Course, CourseSlug, CourseSummary, ModuleDetail, ModuleSlug};
use storage::repository::{CatalogRepository, StorageError};

use crate::error::CatalogError;

/// Read access to courses and module content with slug-aware not-found errors.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the catalog cannot be read.
    pub async fn list_courses(&self) -> Result<Vec<CourseSummary>, CatalogError> {
        Ok(self.catalog.list_courses().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown course.
    pub async fn course(&self, slug: &CourseSlug) -> Result<Course, CatalogError> {
        self.catalog.get_course(slug).await.map_err(|err| match err {
            StorageError::NotFound => CatalogError::NotFound {
                kind: "course",
                slug: slug.to_string(),
            },
            other => other.into(),
        })
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown course or module.
    pub async fn module(
        &self,
        course: &CourseSlug,
        module: &ModuleSlug,
    ) -> Result<ModuleDetail, CatalogError> {
        self.catalog
            .get_module(course, module)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => CatalogError::NotFound {
                    kind: "module",
                    slug: module.to_string(),
                },
                other => other.into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CourseColor, ModuleSummary};
    use storage::InMemoryRepository;

    #[tokio::test]
    async fn not_found_names_the_missing_slug() {
        let repo = InMemoryRepository::new();
        let module = ModuleSummary::new(ModuleSlug::new("m1").unwrap(), "One", "", 0, None).unwrap();
        repo.upsert_course(
            Course::new(
                CourseSlug::new("c").unwrap(),
                "Course",
                "",
                "",
                CourseColor::Gold,
                vec![module],
            )
            .unwrap(),
        )
        .unwrap();
        let service = CatalogService::new(Arc::new(repo));

        let err = service
            .course(&CourseSlug::new("nope").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "course nope not found");

        let err = service
            .module(&CourseSlug::new("c").unwrap(), &ModuleSlug::new("m9").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { kind: "module", .. }));
    }
}
