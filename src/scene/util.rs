use image::Rgb;
use nalgebra as na;
use na::{vector, Vector3, Vector4};

use super::buffer::Color;

/// Transformation of a point to homogenous coordinates.
pub fn to_hom_point(v: Vector3<f32>) -> Vector4<f32> {
    return vector![v.x, v.y, v.z, 1.0];
}

/// Transformation of a vector to homogenous coordinates.
pub fn to_hom_vector(v: Vector3<f32>) -> Vector4<f32> {
    return vector![v.x, v.y, v.z, 0.0];
}

/// Transformation of a vector from homogenous coordinates, w is dropped.
pub fn from_hom_vector(v: Vector4<f32>) -> Vector3<f32> {
    return vector![v.x, v.y, v.z];
}

/// Convex combination of two colors: t * c_1 + (1 - t) * c_2, t is clamped to [0, 1].
pub fn color_blend(color_1: Color, color_2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (t * a as f32 + (1.0 - t) * b as f32).round() as u8;
    return Rgb([
        mix(color_1[0], color_2[0]),
        mix(color_1[1], color_2[1]),
        mix(color_1[2], color_2[2]),
    ]);
}
