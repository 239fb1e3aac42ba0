//! Text descriptions for images and search instructions.
//!
//! Producing a description (OCR, vision models, translation) happens outside
//! this crate. The store consumes it through the [`Describer`] trait and
//! treats every failure as recoverable.

use std::path::Path;

use thiserror::Error;

/// Errors returned by a [`Describer`].
#[derive(Error, Debug)]
pub enum DescribeError {
    #[error(
        "Description failed: {0}\nSuggestion: Provide a description explicitly or check the description service"
    )]
    DescriptionFailed(String),
}

/// Description of an uploaded image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDescription {
    /// Plain-text description, the text that gets embedded
    pub description: String,

    /// Named entities and other extracted terms, stored as OCR text
    pub terms: Vec<String>,
}

impl ImageDescription {
    /// Terms joined into the form stored in the image row.
    #[must_use]
    pub fn ocr_text(&self) -> String {
        self.terms.join(", ")
    }
}

/// Normalized form of a free-text search instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionDescription {
    pub normalized_text: String,
    pub terms: Vec<String>,
}

/// Produces descriptions for images and search instructions.
pub trait Describer: Send + Sync {
    /// Describe the image stored at `path`.
    fn describe_image(&self, path: &Path) -> Result<ImageDescription, DescribeError>;

    /// Normalize a search instruction and extract its terms.
    fn describe_instruction(&self, text: &str) -> Result<InstructionDescription, DescribeError>;
}

/// Describer that serves descriptions supplied by the caller.
///
/// Images get the configured description, or fail when none was given so the
/// store records them without a vector. Instructions are normalized locally:
/// whitespace is collapsed and capitalized words are taken as terms.
#[derive(Debug, Clone, Default)]
pub struct ProvidedDescriber {
    image: Option<ImageDescription>,
}

impl ProvidedDescriber {
    /// Describer with no image description; image adds become vector-less.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Describer that answers every image with `description` and `terms`.
    #[must_use]
    pub fn with_image(description: impl Into<String>, terms: Vec<String>) -> Self {
        Self {
            image: Some(ImageDescription {
                description: description.into(),
                terms,
            }),
        }
    }
}

impl Describer for ProvidedDescriber {
    fn describe_image(&self, path: &Path) -> Result<ImageDescription, DescribeError> {
        match &self.image {
            Some(description) if !description.description.trim().is_empty() => {
                Ok(description.clone())
            }
            _ => Err(DescribeError::DescriptionFailed(format!(
                "no description available for {}",
                path.display()
            ))),
        }
    }

    fn describe_instruction(&self, text: &str) -> Result<InstructionDescription, DescribeError> {
        let normalized_text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized_text.is_empty() {
            return Err(DescribeError::DescriptionFailed(
                "instruction is empty".to_string(),
            ));
        }

        let terms = normalized_text
            .split(' ')
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|word| word.chars().next().is_some_and(char::is_uppercase))
            .map(str::to_string)
            .collect();

        Ok(InstructionDescription {
            normalized_text,
            terms,
        })
    }
}
