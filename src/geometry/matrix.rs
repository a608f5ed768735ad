use std::ops::{Index, IndexMut};

use nalgebra as na;
use na::{DMatrix, Matrix4, SVector, Vector3};

use super::GeometryError;

/// Rows x cols grid of f32. Almost always a 4x4 homogeneous transform, but the shape is a
/// runtime property so mismatches are reported instead of being impossible to express.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: DMatrix<f32>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        return Self { data: DMatrix::zeros(rows, cols) };
    }

    pub fn identity(dimension: usize) -> Self {
        return Self { data: DMatrix::identity(dimension, dimension) };
    }

    /// Builds a matrix from a row-major slice, which must hold exactly `rows * cols` values.
    pub fn from_row_slice(rows: usize, cols: usize, values: &[f32]) -> Result<Self, GeometryError> {
        if values.len() != rows * cols {
            return Err(GeometryError::DimensionMismatch {
                left: (rows, cols),
                right: (values.len(), 1),
            });
        }
        return Ok(Self { data: DMatrix::from_row_slice(rows, cols, values) });
    }

    pub fn rows(&self) -> usize {
        return self.data.nrows();
    }

    pub fn cols(&self) -> usize {
        return self.data.ncols();
    }

    pub fn shape(&self) -> (usize, usize) {
        return self.data.shape();
    }

    pub fn is_square(&self) -> bool {
        return self.rows() == self.cols();
    }

    pub fn try_add(&self, other: &Matrix) -> Result<Matrix, GeometryError> {
        self.check_same_shape(other)?;
        return Ok(Self { data: &self.data + &other.data });
    }

    pub fn try_sub(&self, other: &Matrix) -> Result<Matrix, GeometryError> {
        self.check_same_shape(other)?;
        return Ok(Self { data: &self.data - &other.data });
    }

    /// Matrix product `self * other`, requires `self.cols() == other.rows()`.
    pub fn try_mul(&self, other: &Matrix) -> Result<Matrix, GeometryError> {
        if self.cols() != other.rows() {
            return Err(GeometryError::DimensionMismatch { left: self.shape(), right: other.shape() });
        }
        return Ok(Self { data: &self.data * &other.data });
    }

    /// Applies a square `D`x`D` matrix to a `D` dimensional vector.
    pub fn mul_vector<const D: usize>(&self, v: &SVector<f32, D>) -> Result<SVector<f32, D>, GeometryError> {
        if self.rows() != D || self.cols() != D {
            return Err(GeometryError::DimensionMismatch { left: self.shape(), right: (D, 1) });
        }
        return Ok(SVector::<f32, D>::from_fn(|i, _| {
            (0..D).map(|j| self.data[(i, j)] * v[j]).sum()
        }));
    }

    pub fn scale(&self, factor: f32) -> Matrix {
        return Self { data: &self.data * factor };
    }

    pub fn transpose(&self) -> Matrix {
        return Self { data: self.data.transpose() };
    }

    /// Determinant by cofactor expansion along the first row.
    /// Exponential in the dimension, which is fine for the 4x4 matrices we actually use.
    pub fn determinant(&self) -> Result<f32, GeometryError> {
        if !self.is_square() {
            return Err(GeometryError::NotSquare { rows: self.rows(), cols: self.cols() });
        }
        return Ok(self.laplace_determinant());
    }

    /// Inverse via adjugate / determinant. Fails only if the determinant is exactly zero.
    pub fn inverse(&self) -> Result<Matrix, GeometryError> {
        let det = self.determinant()?;
        if det == 0.0 {
            return Err(GeometryError::Singular);
        }
        let n = self.rows();
        // Adjugate is the transposed cofactor matrix, hence (j, i).
        let adjugate = DMatrix::from_fn(n, n, |i, j| self.cofactor(j, i));
        return Ok(Self { data: adjugate / det });
    }

    /// Transpose of the inverse, the matrix that keeps normals perpendicular to transformed surfaces.
    pub fn inverse_transpose(&self) -> Result<Matrix, GeometryError> {
        return Ok(self.inverse()?.transpose());
    }

    /// Largest absolute element-wise difference, handy for approximate comparisons.
    pub fn max_abs_diff(&self, other: &Matrix) -> Result<f32, GeometryError> {
        let diff = self.try_sub(other)?;
        return Ok(diff.data.iter().fold(0.0f32, |acc, value| acc.max(value.abs())));
    }

    /// Converts to a fixed size nalgebra matrix for the hot per-vertex path.
    pub fn to_matrix4(&self) -> Result<Matrix4<f32>, GeometryError> {
        if self.shape() != (4, 4) {
            return Err(GeometryError::DimensionMismatch { left: self.shape(), right: (4, 4) });
        }
        return Ok(Matrix4::from_fn(|i, j| self.data[(i, j)]));
    }

    /// Homogeneous translation by `offset`.
    pub fn translation(offset: Vector3<f32>) -> Matrix {
        let mut m = Matrix::identity(4);
        for i in 0..3 {
            m[(i, 3)] = offset[i];
        }
        return m;
    }

    /// Homogeneous uniform scaling.
    pub fn scaling(factor: f32) -> Matrix {
        let mut m = Matrix::identity(4);
        for i in 0..3 {
            m[(i, i)] = factor;
        }
        return m;
    }

    /// Homogeneous rotation around the x axis, angle in radians.
    pub fn rotation_x(angle: f32) -> Matrix {
        let (sin, cos) = angle.sin_cos();
        let mut m = Matrix::identity(4);
        m[(1, 1)] = cos;
        m[(1, 2)] = -sin;
        m[(2, 1)] = sin;
        m[(2, 2)] = cos;
        return m;
    }

    /// Homogeneous rotation around the y axis, angle in radians.
    pub fn rotation_y(angle: f32) -> Matrix {
        let (sin, cos) = angle.sin_cos();
        let mut m = Matrix::identity(4);
        m[(0, 0)] = cos;
        m[(0, 2)] = sin;
        m[(2, 0)] = -sin;
        m[(2, 2)] = cos;
        return m;
    }

    /// Homogeneous rotation around the z axis, angle in radians.
    pub fn rotation_z(angle: f32) -> Matrix {
        let (sin, cos) = angle.sin_cos();
        let mut m = Matrix::identity(4);
        m[(0, 0)] = cos;
        m[(0, 1)] = -sin;
        m[(1, 0)] = sin;
        m[(1, 1)] = cos;
        return m;
    }

    fn check_same_shape(&self, other: &Matrix) -> Result<(), GeometryError> {
        if self.shape() != other.shape() {
            return Err(GeometryError::DimensionMismatch { left: self.shape(), right: other.shape() });
        }
        return Ok(());
    }

    /// Copy of the matrix without row `row` and column `col`.
    fn minor(&self, row: usize, col: usize) -> Matrix {
        return Self { data: self.data.clone().remove_row(row).remove_column(col) };
    }

    fn cofactor(&self, row: usize, col: usize) -> f32 {
        let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
        return sign * self.minor(row, col).laplace_determinant();
    }

    // Callers make sure the matrix is square.
    fn laplace_determinant(&self) -> f32 {
        match self.rows() {
            0 => 1.0,
            1 => self.data[(0, 0)],
            2 => self.data[(0, 0)] * self.data[(1, 1)] - self.data[(0, 1)] * self.data[(1, 0)],
            n => (0..n).map(|col| self.data[(0, col)] * self.cofactor(0, col)).sum(),
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, index: (usize, usize)) -> &f32 {
        return &self.data[index];
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f32 {
        return &mut self.data[index];
    }
}

impl From<Matrix4<f32>> for Matrix {
    fn from(m: Matrix4<f32>) -> Self {
        return Self { data: DMatrix::from_fn(4, 4, |i, j| m[(i, j)]) };
    }
}
