//! Error types for the vector store and search engine
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::describe::DescribeError;
use crate::metadata::MetadataError;
use crate::vector::VectorError;

/// Main error type for store and search operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Unknown debate or image id
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u32 },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Wrong dimensionality or zero norm
    #[error("Invalid vector: {0}")]
    InvalidVector(#[source] VectorError),

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error(transparent)]
    DescriptionFailed(#[from] DescribeError),

    /// Slot or image without a partner in the identity map
    #[error("Inconsistent binding: {reason}")]
    InconsistentBinding { reason: String },

    #[error("Invalid image path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Metadata store error: {0}")]
    Metadata(#[source] MetadataError),

    #[error("Vector index error: {0}")]
    Vector(#[from] VectorError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl From<MetadataError> for StoreError {
    fn from(error: MetadataError) -> Self {
        match error {
            MetadataError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Metadata(other),
        }
    }
}

impl StoreError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::InvalidVector(_) => "INVALID_VECTOR",
            Self::EmbeddingFailed(_) => "EMBEDDING_FAILED",
            Self::DescriptionFailed(_) => "DESCRIPTION_FAILED",
            Self::InconsistentBinding { .. } => "INCONSISTENT_BINDING",
            Self::InvalidPath { .. } => "INVALID_PATH",
            Self::Metadata(_) => "METADATA_ERROR",
            Self::Vector(_) => "VECTOR_ERROR",
            Self::Io { .. } => "IO_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
        .to_string()
    }

    /// True when the persisted index or database cannot be trusted.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Vector(VectorError::InvalidFormat(_) | VectorError::VersionMismatch { .. })
                | Self::InconsistentBinding { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::NotFound { .. } => vec![
                "Run 'debate-search debate list' to see existing debates",
            ],
            Self::InvalidVector(_) => vec![
                "Check that the embedding model matches the configured store dimension",
                "Zero vectors cannot be normalized; make sure the description is not empty",
            ],
            Self::EmbeddingFailed(_) => vec![
                "Ensure you have internet connection for first-time model download",
                "Search falls back to lexical matching while embeddings are unavailable",
            ],
            Self::InconsistentBinding { .. } => vec![
                "Run 'debate-search stats' to compare vector and image counts",
                "Run 'debate-search reset --yes' and re-add images if the problem persists",
            ],
            Self::Vector(VectorError::InvalidFormat(_) | VectorError::VersionMismatch { .. }) => {
                vec![
                    "The index snapshot is unreadable; run 'debate-search reset --yes' to start over",
                    "Check for disk errors or filesystem corruption",
                ]
            }
            Self::Metadata(_) | Self::Io { .. } => vec![
                "Check disk space and permissions in the data directory",
                "Ensure the database is not locked by another process",
            ],
            Self::Config { .. } => vec![
                "Run 'debate-search config' to inspect the effective settings",
                "Run 'debate-search init --force' to regenerate the settings file",
            ],
            _ => vec![],
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Extension trait for attaching file paths to I/O errors
pub trait IoContext<T> {
    fn with_path(self, path: &std::path::Path) -> StoreResult<T>;
}

impl<T> IoContext<T> for Result<T, std::io::Error> {
    fn with_path(self, path: &std::path::Path) -> StoreResult<T> {
        self.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
