//! Builders for the view, projection and viewport transforms, and the per-frame [`Transforms`]
//! context that shaders read them from.

use nalgebra as na;
use na::{Matrix4, Rotation3, Vector3, Vector4};

use super::util::{from_hom_vector, to_hom_point, to_hom_vector};
use crate::geometry::{GeometryError, Matrix, VectorExt};

/// View matrix of a camera at `eye` looking at `center`.
///
/// New basis: z points from the center to the eye, x = up × z, y = z × x, and the eye becomes
/// the origin. Fails if `up` is parallel to the view direction or `eye == center`.
pub fn look_at(eye: Vector3<f32>, center: Vector3<f32>, up: Vector3<f32>) -> Result<Matrix, GeometryError> {
    let z = (eye - center).unit().map_err(|_| GeometryError::DegenerateCameraBasis)?;
    let x = up.cross(&z).unit().map_err(|_| GeometryError::DegenerateCameraBasis)?;
    let y = z.cross(&x);
    let mut basis = Matrix::identity(4);
    for i in 0..3 {
        basis[(0, i)] = x[i];
        basis[(1, i)] = y[i];
        basis[(2, i)] = z[i];
    }
    return basis.try_mul(&Matrix::translation(-eye));
}

/// Symmetric perspective projection. Camera looks down -z, visible points end up with w > 0,
/// near maps to z_ndc = -1 and far to z_ndc = 1.
pub fn perspective(near: f32, far: f32, fov_y_degrees: f32, aspect: f32) -> Result<Matrix, GeometryError> {
    if !(near > 0.0) {
        return Err(GeometryError::InvalidProjection("near plane must be positive"));
    }
    if !(far > near) {
        return Err(GeometryError::InvalidProjection("far plane must lie beyond the near plane"));
    }
    if !(fov_y_degrees > 0.0 && fov_y_degrees < 180.0) {
        return Err(GeometryError::InvalidProjection("field of view must be within (0, 180) degrees"));
    }
    if !(aspect > 0.0) {
        return Err(GeometryError::InvalidProjection("aspect ratio must be positive"));
    }
    let focal = 1.0 / (fov_y_degrees.to_radians() / 2.0).tan();
    let mut m = Matrix::zeros(4, 4);
    m[(0, 0)] = focal / aspect;
    m[(1, 1)] = focal;
    m[(2, 2)] = -(far + near) / (far - near);
    m[(2, 3)] = -2.0 * far * near / (far - near);
    m[(3, 2)] = -1.0;
    return Ok(m);
}

/// Maps NDC [-1, 1]^3 to the pixel rectangle [x, x + w] x [y, y + h] and depth to [0, depth].
pub fn viewport(x: f32, y: f32, w: f32, h: f32, depth: f32) -> Matrix {
    let mut m = Matrix::identity(4);
    m[(0, 0)] = w / 2.0;
    m[(0, 3)] = x + w / 2.0;
    m[(1, 1)] = h / 2.0;
    m[(1, 3)] = y + h / 2.0;
    m[(2, 2)] = depth / 2.0;
    m[(2, 3)] = depth / 2.0;
    return m;
}

/// Transform set of one frame. Computed once, then only read by vertex shaders.
#[derive(Debug, Clone)]
pub struct Transforms {
    pub model_view: Matrix,
    pub projection: Matrix,
    pub viewport: Matrix,
    // Cached fixed size products for the per-vertex path.
    vpmv_matrix: Matrix4<f32>,  // viewport * projection * model_view.
    mv_matrix: Matrix4<f32>,    // Applied to directions like the light.
    it_mv_matrix: Matrix4<f32>, // Applied to model normals.
}

impl Transforms {
    pub fn new(model_view: Matrix, projection: Matrix, viewport: Matrix) -> Result<Self, GeometryError> {
        let vpmv = viewport.try_mul(&projection)?.try_mul(&model_view)?;
        let it_mv = model_view.inverse_transpose()?;
        return Ok(Self {
            vpmv_matrix: vpmv.to_matrix4()?,
            mv_matrix: model_view.to_matrix4()?,
            it_mv_matrix: it_mv.to_matrix4()?,
            model_view,
            projection,
            viewport,
        });
    }

    /// Object space point to clip space, viewport already applied but not divided by w.
    pub fn to_clip(&self, position: Vector3<f32>) -> Vector4<f32> {
        return self.vpmv_matrix * to_hom_point(position);
    }

    /// Object space direction (light, view vector) to camera space.
    pub fn to_view_direction(&self, direction: Vector3<f32>) -> Vector3<f32> {
        return from_hom_vector(self.mv_matrix * to_hom_vector(direction));
    }

    /// Object space normal to camera space, not normalized.
    pub fn to_view_normal(&self, normal: Vector3<f32>) -> Vector3<f32> {
        return from_hom_vector(self.it_mv_matrix * to_hom_vector(normal));
    }
}

/// Camera placement and lens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vector3<f32>,
    pub center: Vector3<f32>,
    pub up: Vector3<f32>,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        return Self {
            eye: Vector3::new(1.0, 1.0, 3.0),
            center: Vector3::zeros(),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 100.0,
        };
    }
}

impl Camera {
    /// Transform set rendering into a `width` x `height` image with depth in [0, depth].
    pub fn transforms(&self, width: u32, height: u32, depth: f32) -> Result<Transforms, GeometryError> {
        let model_view = look_at(self.eye, self.center, self.up)?;
        let projection = perspective(self.near, self.far, self.fov_y_degrees, width as f32 / height as f32)?;
        let viewport = viewport(0.0, 0.0, width as f32, height as f32, depth);
        return Transforms::new(model_view, projection, viewport);
    }

    /// Camera with the eye rotated by `angle` radians around the center, about the up axis.
    pub fn orbit(&self, angle: f32) -> Result<Camera, GeometryError> {
        let axis = self.up.unit()?;
        let rotation = Rotation3::new(axis * angle);
        return Ok(Camera {
            eye: self.center + rotation * (self.eye - self.center),
            ..*self
        });
    }
}
