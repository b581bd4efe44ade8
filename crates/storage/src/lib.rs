#![forbid(unsafe_code)]

pub mod catalog;
pub mod local;
pub mod repository;
pub mod sqlite;

pub use catalog::{CatalogLoadError, JsonCatalog};
pub use repository::{
    CatalogRepository, CompletionRequest, InMemoryRepository, ProgressRepository, Storage,
    StorageError,
};
