//! Type-safe wrappers and core types for the vector index.
//!
//! Newtypes keep slot positions, similarity scores and dimensions from being
//! mixed up with plain integers and floats at the store boundary.

use thiserror::Error;

/// Standard vector dimension for description embeddings (BGE large, 1024 floats).
pub const VECTOR_DIMENSION_1024: usize = 1024;

/// Position of a vector inside the [`VectorIndex`](crate::vector::VectorIndex).
///
/// Slots start at zero and are assigned in insertion order. A slot is never
/// reused; removing a vector leaves a tombstone at its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(u32);

impl Slot {
    /// Creates a new `Slot`.
    #[must_use]
    pub const fn new(position: u32) -> Self {
        Self(position)
    }

    /// Returns the underlying u32 value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the position as an index into slot-ordered storage.
    #[must_use]
    pub const fn as_index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inner-product similarity between two unit vectors.
///
/// For normalized inputs the value lies in [-1.0, 1.0] and equals the cosine
/// similarity. NaN is rejected so that scores are totally ordered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score(f32);

impl Score {
    /// Creates a new `Score` with validation.
    ///
    /// Returns an error if the value is NaN or infinite.
    pub fn new(value: f32) -> Result<Self, VectorError> {
        if value.is_nan() {
            return Err(VectorError::InvalidScore {
                value,
                reason: "Score cannot be NaN",
            });
        }
        if value.is_infinite() {
            return Err(VectorError::InvalidScore {
                value,
                reason: "Score must be finite",
            });
        }
        Ok(Self(value))
    }

    /// Creates a score of 0.0 (orthogonal vectors).
    #[must_use]
    pub const fn zero() -> Self {
        Self(0.0)
    }

    /// Creates a score of 1.0 (identical direction).
    #[must_use]
    pub const fn one() -> Self {
        Self(1.0)
    }

    /// Returns the underlying f32 value.
    #[must_use]
    pub fn get(&self) -> f32 {
        self.0
    }

    /// Cosine distance (`1 - similarity`), never negative.
    #[must_use]
    pub fn distance(&self) -> f32 {
        (1.0 - self.0).max(0.0)
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Type-safe wrapper for vector dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Creates the standard 1024-dimensional vector dimension.
    #[must_use]
    pub const fn dimension_1024() -> Self {
        Self(VECTOR_DIMENSION_1024)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Errors that can occur during vector operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors use the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Vector has zero or non-finite length and cannot be normalized\nSuggestion: Check the embedding output for empty or corrupted values"
    )]
    ZeroNorm,

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error("Invalid score value: {value}\nReason: {reason}")]
    InvalidScore { value: f32, reason: &'static str },

    #[error("Slot {slot} is out of range (index holds {len} slots)")]
    SlotOutOfRange { slot: u32, len: usize },

    #[error("Storage error: {0}\nSuggestion: Check disk space and file permissions")]
    Storage(#[from] std::io::Error),

    #[error(
        "Invalid snapshot format: {0}\nSuggestion: The index snapshot may be corrupted. Reset the store and re-add images"
    )]
    InvalidFormat(String),

    #[error(
        "Embedding generation failed: {0}\nSuggestion: Verify the embedding model is properly initialized"
    )]
    EmbeddingFailed(String),

    #[error(
        "Invalid snapshot version: expected {expected}, got {actual}\nSuggestion: Reset the store or use a compatible version"
    )]
    VersionMismatch { expected: u32, actual: u32 },
}
