/// A single bullet or example line inside a structured section.
pub type ContentLine = String;

/// One block of module content.
///
/// Older catalogs stored each section as a bare paragraph; newer ones use a
/// titled section with bullet points and examples. Both shapes are mapped to
/// this variant at the catalog boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSection {
    Plain(String),
    Structured {
        title: String,
        description: Option<String>,
        points: Vec<ContentLine>,
        examples: Vec<ContentLine>,
    },
}

impl ContentSection {
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    /// Builds a structured section, dropping blank lines and a blank description.
    #[must_use]
    pub fn structured(
        title: impl Into<String>,
        description: Option<String>,
        points: Vec<ContentLine>,
        examples: Vec<ContentLine>,
    ) -> Self {
        let keep = |lines: Vec<ContentLine>| -> Vec<ContentLine> {
            lines
                .into_iter()
                .map(|line| line.trim().to_owned())
                .filter(|line| !line.is_empty())
                .collect()
        };
        Self::Structured {
            title: title.into().trim().to_owned(),
            description: description
                .map(|d| d.trim().to_owned())
                .filter(|d| !d.is_empty()),
            points: keep(points),
            examples: keep(examples),
        }
    }

    /// Heading for structured sections; plain paragraphs have none.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Structured { title, .. } => Some(title),
        }
    }

    #[must_use]
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Plain(_))
    }
}
