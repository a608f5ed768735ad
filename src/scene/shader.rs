//! Two stage shading contract the rasterizer drives, plus the shaders the app ships with.
//!
//! The rasterizer hands fragments raw screen-space barycentric weights. Anything a shader
//! interpolates that is not affine in screen space (which is everything under perspective) has
//! to be corrected by the shader itself, [`PerspectiveVaryings`] does the bookkeeping.

use std::sync::Arc;

use image::RgbImage;
use nalgebra as na;
use na::{Matrix2x3, Vector2, Vector3, Vector4};

use super::buffer::{Color, BLACK, WHITE};
use super::camera::Transforms;
use super::model::SharedMesh;
use super::util::color_blend;
use crate::geometry::VectorExt;

pub trait Shader {
    /// Transforms corner `slot` (0, 1 or 2) of face `face` and stores whatever the fragment
    /// stage needs for it. Called for all three slots of a face before any fragment of it.
    /// Returns the clip space position with the viewport applied, not divided by w.
    fn vertex(&mut self, transforms: &Transforms, face: usize, slot: usize) -> Vector4<f32>;

    /// Shades one fragment of the current face. `bar` are raw screen-space barycentric weights,
    /// summing to 1. Returns true to discard the fragment.
    fn fragment(&mut self, bar: Vector3<f32>, color: &mut Color) -> bool;
}

/// Turns screen-space weights into weights that interpolate linearly in camera space:
/// b_i / w_i, renormalized. Falls back to `bar` if no vertex had a usable w.
pub fn perspective_correct(bar: Vector3<f32>, inv_w: Vector3<f32>) -> Vector3<f32> {
    let weighted = bar.component_mul(&inv_w);
    let sum = weighted.sum();
    if sum == 0.0 || !sum.is_finite() {
        return bar;
    }
    return weighted / sum;
}

/// 1/w of each corner of the current face.
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveVaryings {
    inv_w: Vector3<f32>,
}

impl Default for PerspectiveVaryings {
    fn default() -> Self {
        return Self { inv_w: Vector3::repeat(1.0) };
    }
}

impl PerspectiveVaryings {
    pub fn store(&mut self, slot: usize, clip: &Vector4<f32>) {
        self.inv_w[slot] = 1.0 / clip.w;
    }

    pub fn correct(&self, bar: Vector3<f32>) -> Vector3<f32> {
        return perspective_correct(bar, self.inv_w);
    }

    /// Perspective correct interpolation of one scalar per corner.
    pub fn interpolate(&self, bar: Vector3<f32>, values: &Vector3<f32>) -> f32 {
        return values.dot(&self.correct(bar));
    }

    /// Perspective correct interpolation of a 2d value per corner, stored as columns.
    pub fn interpolate2(&self, bar: Vector3<f32>, values: &Matrix2x3<f32>) -> Vector2<f32> {
        return values * self.correct(bar);
    }
}

/// Lambert term of an object space normal and light direction, evaluated in camera space.
fn diffuse(transforms: &Transforms, normal: Vector3<f32>, light_direction: Vector3<f32>) -> f32 {
    let normal = transforms.to_view_normal(normal).unit();
    let light = transforms.to_view_direction(light_direction).unit();
    match (normal, light) {
        (Ok(n), Ok(l)) => n.dot(&l).max(0.0),
        // Models sometimes carry zero normals, those corners just stay dark.
        _ => 0.0,
    }
}

/// Fills every face with one color.
#[derive(Clone)]
pub struct FlatShader {
    mesh: SharedMesh,
    pub color: Color,
}

impl FlatShader {
    pub fn new(mesh: SharedMesh, color: Color) -> Self {
        return Self { mesh, color };
    }
}

impl Shader for FlatShader {
    fn vertex(&mut self, transforms: &Transforms, face: usize, slot: usize) -> Vector4<f32> {
        return transforms.to_clip(self.mesh.position(face, slot));
    }

    fn fragment(&mut self, _bar: Vector3<f32>, color: &mut Color) -> bool {
        *color = self.color;
        return false;
    }
}

/// Light intensity computed per vertex from the model normals and interpolated across the face.
#[derive(Clone)]
pub struct GouraudShader {
    mesh: SharedMesh,
    pub light_direction: Vector3<f32>,
    pub color: Color,
    // Local buffer for passing values between vertex and fragment parts of the pipeline.
    vertex_intensities: Vector3<f32>,
    varyings: PerspectiveVaryings,
}

impl GouraudShader {
    pub fn new(mesh: SharedMesh, light_direction: Vector3<f32>) -> Self {
        return Self {
            mesh,
            light_direction,
            color: WHITE,
            vertex_intensities: Vector3::zeros(),
            varyings: PerspectiveVaryings::default(),
        };
    }
}

impl Shader for GouraudShader {
    fn vertex(&mut self, transforms: &Transforms, face: usize, slot: usize) -> Vector4<f32> {
        let normal = self.mesh.normal(face, slot);
        self.vertex_intensities[slot] = diffuse(transforms, normal, self.light_direction);
        let clip = transforms.to_clip(self.mesh.position(face, slot));
        self.varyings.store(slot, &clip);
        return clip;
    }

    fn fragment(&mut self, bar: Vector3<f32>, color: &mut Color) -> bool {
        let intensity = self.varyings.interpolate(bar, &self.vertex_intensities);
        *color = color_blend(self.color, BLACK, intensity);
        return false;
    }
}

/// Diffuse texture looked up at the perspective correct uv, dimmed by Gouraud intensity.
#[derive(Clone)]
pub struct TexturedShader {
    mesh: SharedMesh,
    texture: Arc<RgbImage>,
    pub light_direction: Vector3<f32>,
    vertex_intensities: Vector3<f32>,
    vertex_uvs: Matrix2x3<f32>, // UV coordinates of each corner as columns.
    varyings: PerspectiveVaryings,
}

impl TexturedShader {
    pub fn new(mesh: SharedMesh, texture: Arc<RgbImage>, light_direction: Vector3<f32>) -> Self {
        return Self {
            mesh,
            texture,
            light_direction,
            vertex_intensities: Vector3::zeros(),
            vertex_uvs: Matrix2x3::zeros(),
            varyings: PerspectiveVaryings::default(),
        };
    }

    /// Nearest texel at `uv`. v grows upwards while image rows grow downwards, so v is flipped
    /// here and only here.
    fn sample(&self, uv: Vector2<f32>) -> Color {
        let (width, height) = self.texture.dimensions();
        if width == 0 || height == 0 {
            return WHITE;
        }
        let u = uv.x.clamp(0.0, 1.0);
        let v = 1.0 - uv.y.clamp(0.0, 1.0);
        let x = ((u * (width - 1) as f32).round() as u32).min(width - 1);
        let y = ((v * (height - 1) as f32).round() as u32).min(height - 1);
        return *self.texture.get_pixel(x, y);
    }
}

impl Shader for TexturedShader {
    fn vertex(&mut self, transforms: &Transforms, face: usize, slot: usize) -> Vector4<f32> {
        let normal = self.mesh.normal(face, slot);
        self.vertex_intensities[slot] = diffuse(transforms, normal, self.light_direction);
        self.vertex_uvs.set_column(slot, &self.mesh.uv(face, slot));
        let clip = transforms.to_clip(self.mesh.position(face, slot));
        self.varyings.store(slot, &clip);
        return clip;
    }

    fn fragment(&mut self, bar: Vector3<f32>, color: &mut Color) -> bool {
        let uv = self.varyings.interpolate2(bar, &self.vertex_uvs);
        let intensity = self.varyings.interpolate(bar, &self.vertex_intensities);
        *color = color_blend(self.sample(uv), BLACK, intensity);
        return false;
    }
}
