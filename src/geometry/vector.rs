use nalgebra as na;
use na::SVector;

use super::GeometryError;

/// Vectors shorter than this can't be normalized.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Operations nalgebra vectors lack or only offer in a panicking/NaN producing form.
pub trait VectorExt: Sized {
    /// Scales the vector to the given length.
    fn normalize_to(&self, length: f32) -> Result<Self, GeometryError>;

    /// Same as `normalize_to(1.0)`.
    fn unit(&self) -> Result<Self, GeometryError> {
        return self.normalize_to(1.0);
    }

    /// Lifts the vector to `N` dimensions, new components are set to `fill`.
    /// `fill = 1.0` promotes a point to homogeneous coordinates.
    fn embed<const N: usize>(&self, fill: f32) -> Result<SVector<f32, N>, GeometryError>;

    /// Keeps the first `N` components.
    fn project<const N: usize>(&self) -> Result<SVector<f32, N>, GeometryError>;
}

impl<const D: usize> VectorExt for SVector<f32, D> {
    fn normalize_to(&self, length: f32) -> Result<Self, GeometryError> {
        let norm = self.norm();
        // Also catches NaN, since every comparison with it is false.
        if !(norm > DEGENERATE_EPSILON) {
            return Err(GeometryError::DegenerateVector);
        }
        return Ok(self * (length / norm));
    }

    fn embed<const N: usize>(&self, fill: f32) -> Result<SVector<f32, N>, GeometryError> {
        if N < D {
            return Err(GeometryError::DimensionMismatch { left: (D, 1), right: (N, 1) });
        }
        return Ok(SVector::<f32, N>::from_fn(|i, _| if i < D { self[i] } else { fill }));
    }

    fn project<const N: usize>(&self) -> Result<SVector<f32, N>, GeometryError> {
        if N > D {
            return Err(GeometryError::DimensionMismatch { left: (D, 1), right: (N, 1) });
        }
        return Ok(SVector::<f32, N>::from_fn(|i, _| self[i]));
    }
}
