//! Vector and matrix algebra backing the transform pipeline.
//!
//! Vectors are plain nalgebra `SVector`s with a few extra operations from [`VectorExt`],
//! matrices are runtime-shaped [`Matrix`] values so shape errors surface as [`GeometryError`]
//! instead of panics.

mod matrix;
mod vector;

use std::fmt;

pub use matrix::Matrix;
pub use vector::{VectorExt, DEGENERATE_EPSILON};

/// Everything that can go wrong in vector/matrix operations and the camera builders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    /// Operand shapes, as (rows, cols), don't fit the operation.
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// Determinant or inverse of a non-square matrix.
    NotSquare { rows: usize, cols: usize },
    /// Inverse of a matrix with zero determinant.
    Singular,
    /// Normalizing a vector of (near) zero length.
    DegenerateVector,
    /// Up direction parallel to the view direction, or eye placed at the target.
    DegenerateCameraBasis,
    /// Projection parameters outside of their valid range.
    InvalidProjection(&'static str),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { left, right } => write!(
                f,
                "dimension mismatch: {}x{} against {}x{}",
                left.0, left.1, right.0, right.1
            ),
            Self::NotSquare { rows, cols } => write!(f, "matrix is not square: {rows}x{cols}"),
            Self::Singular => write!(f, "matrix is singular and cannot be inverted"),
            Self::DegenerateVector => write!(f, "cannot normalize a zero length vector"),
            Self::DegenerateCameraBasis => {
                write!(f, "camera basis is degenerate: up is parallel to the view direction")
            }
            Self::InvalidProjection(reason) => write!(f, "invalid projection: {reason}"),
        }
    }
}

impl std::error::Error for GeometryError {}
