//! Dense vector arithmetic used by the index and the store boundary.

use crate::vector::{VectorDimension, VectorError};

/// Dot product of two equal-length slices.
///
/// For unit vectors this is the cosine similarity.
#[must_use]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean length of a vector.
#[must_use]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Returns a unit-length copy of `vector`.
///
/// Fails with `DimensionMismatch` when the length differs from `dimension`
/// and with `ZeroNorm` when the vector has no direction (or holds NaN/inf).
pub fn normalize(vector: &[f32], dimension: VectorDimension) -> Result<Vec<f32>, VectorError> {
    dimension.validate_vector(vector)?;

    let norm = l2_norm(vector);
    if norm == 0.0 || !norm.is_finite() {
        return Err(VectorError::ZeroNorm);
    }

    Ok(vector.iter().map(|x| x / norm).collect())
}

/// True when the vector's length is 1 within `tolerance`.
#[must_use]
pub fn is_unit(vector: &[f32], tolerance: f32) -> bool {
    (l2_norm(vector) - 1.0).abs() <= tolerance
}
