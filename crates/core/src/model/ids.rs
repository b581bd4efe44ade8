use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a slug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SlugError {
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    #[error("{kind} contains invalid character {found:?}")]
    InvalidChar { kind: &'static str, found: char },
}

fn validate_slug(kind: &'static str, raw: &str) -> Result<(), SlugError> {
    if raw.is_empty() {
        return Err(SlugError::Empty { kind });
    }
    if let Some(found) = raw
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(SlugError::InvalidChar { kind, found });
    }
    Ok(())
}

/// Stable identifier of a course, e.g. `corporate-finance`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseSlug(String);

impl CourseSlug {
    /// Parses and validates a course slug.
    ///
    /// # Errors
    ///
    /// Returns `SlugError` when the input is empty or has characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn new(raw: impl Into<String>) -> Result<Self, SlugError> {
        let raw = raw.into();
        validate_slug("course slug", raw.trim())?;
        Ok(Self(raw.trim().to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a module, unique within its course.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleSlug(String);

impl ModuleSlug {
    /// Parses and validates a module slug.
    ///
    /// # Errors
    ///
    /// Returns `SlugError` when the input is empty or has characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn new(raw: impl Into<String>) -> Result<Self, SlugError> {
        let raw = raw.into();
        validate_slug("module slug", raw.trim())?;
        Ok(Self(raw.trim().to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ─── Conversions ───────────────────────────────────────────────────────────────

impl TryFrom<String> for CourseSlug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for ModuleSlug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CourseSlug> for String {
    fn from(value: CourseSlug) -> Self {
        value.0
    }
}

impl From<ModuleSlug> for String {
    fn from(value: ModuleSlug) -> Self {
        value.0
    }
}

impl FromStr for CourseSlug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for ModuleSlug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for CourseSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CourseSlug({})", self.0)
    }
}

impl fmt::Debug for ModuleSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleSlug({})", self.0)
    }
}

impl fmt::Display for CourseSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ModuleSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
