pub mod content;
mod course;
mod ids;
mod progress;

pub use content::ContentSection;
pub use course::{
    Course, CourseColor, CourseError, CourseSummary, ModuleDetail, ModuleSummary,
    ReflectionPrompt,
};
pub use ids::{CourseSlug, ModuleSlug, SlugError};
pub use progress::{CompletedSet, ProgressRecord, ReflectionAnswers, ReflectionError};
