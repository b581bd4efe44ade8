mod service;
mod view;
mod workflow;

// Public API of the progress subsystem.
pub use crate::error::ProgressError;
pub use service::{CourseProgress, Freshness, ModuleView, ProgressService};
pub use workflow::{CompletionOutcome, NextStep};
