//! Magnitude-based bucket assignment

use crate::domain::DomainError;

/// Where a vector lands in the bucket space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPlacement {
    /// Euclidean norm of the vector
    pub norm: f64,
    /// `round(norm * k)`
    pub scaled: i64,
    /// `scaled mod n`
    pub bucket: i64,
}

/// Derives a coarse partition key ("group id") from a vector's norm.
///
/// Insert and query paths must share the same `(scale, count)` pair, or
/// stored entries become unreachable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketAssigner {
    scale: f64,
    count: i64,
}

impl BucketAssigner {
    /// Create an assigner with scale constant `k` and bucket count `n`
    pub fn new(scale: f64, count: i64) -> Result<Self, DomainError> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(DomainError::configuration(format!(
                "bucket scale must be a finite, non-negative number, got {}",
                scale
            )));
        }

        if count < 1 {
            return Err(DomainError::configuration(format!(
                "bucket count must be at least 1, got {}",
                count
            )));
        }

        Ok(Self { scale, count })
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    /// Compute norm, scaled magnitude and bucket for a vector
    pub fn place(&self, vector: &[f64]) -> BucketPlacement {
        let norm = euclidean_norm(vector);
        // Saturating cast; norm and scale are both non-negative
        let scaled = (norm * self.scale).round() as i64;

        BucketPlacement {
            norm,
            scaled,
            bucket: scaled.rem_euclid(self.count),
        }
    }

    /// Bucket id in `[0, count)`
    pub fn bucket_of(&self, vector: &[f64]) -> i64 {
        self.place(vector).bucket
    }
}

/// `sqrt(sum(v_i^2))`
pub fn euclidean_norm(vector: &[f64]) -> f64 {
    vector.iter().map(|v| v * v).sum::<f64>().sqrt()
}
