use std::sync::Arc;

use image::Rgb;
use nalgebra::{vector, Vector3, Vector4};

use tiny_rasterizer::scene::buffer::{Color, Frame, BLACK, FAR_DEPTH, WHITE};
use tiny_rasterizer::scene::camera::{Camera, Transforms};
use tiny_rasterizer::scene::model::{Mesh, SharedMesh, TriangleSoup};
use tiny_rasterizer::scene::rasterizer::{self, Coverage};
use tiny_rasterizer::scene::shader::{FlatShader, Shader};
use tiny_rasterizer::scene::Scene;

const RED: Color = Rgb([255, 0, 0]);
const GREEN: Color = Rgb([0, 255, 0]);

struct Paint(Color);

impl Shader for Paint {
    fn vertex(&mut self, _transforms: &Transforms, _face: usize, _slot: usize) -> Vector4<f32> {
        unreachable!();
    }

    fn fragment(&mut self, _bar: Vector3<f32>, color: &mut Color) -> bool {
        *color = self.0;
        return false;
    }
}

fn flat(points: [(f32, f32); 3]) -> [Vector4<f32>; 3] {
    return points.map(|(x, y)| Vector4::new(x, y, 0.0, 1.0));
}

/// Square split along its diagonal, both halves at the same depth.
fn halves() -> ([Vector4<f32>; 3], [Vector4<f32>; 3]) {
    let lower = flat([(0.0, 0.0), (8.0, 0.0), (8.0, 8.0)]);
    let upper = flat([(0.0, 0.0), (8.0, 8.0), (0.0, 8.0)]);
    return (lower, upper);
}

#[test]
fn shared_edge_has_no_gaps_and_one_owner() {
    let (lower, upper) = halves();
    let mut frame = Frame::new(8, 8);
    let first = rasterizer::triangle(&lower, &mut Paint(RED), &mut frame);
    let second = rasterizer::triangle(&upper, &mut Paint(GREEN), &mut frame);

    // Pixel centers on the diagonal belong to the upper half only, it is that half's right edge.
    assert_eq!(first, Coverage::Drawn { tested: 28, written: 28 });
    assert_eq!(second, Coverage::Drawn { tested: 36, written: 36 });
    for y in 0..8 {
        for x in 0..8 {
            let expected = if y < x { RED } else { GREEN };
            assert_eq!(frame.color_at(x, y), expected, "pixel ({x}, {y})");
            assert_eq!(frame.depth_at(x, y), 0.0);
        }
    }
}

#[test]
fn shared_edge_owner_does_not_depend_on_depth() {
    // Same split, halves at different depths on either side: still one owner per pixel.
    let (lower, upper) = halves();
    let tilt = |mut clip: [Vector4<f32>; 3], z: [f32; 3]| {
        for (v, z) in clip.iter_mut().zip(z) {
            v.z = z;
        }
        return clip;
    };
    let lower = tilt(lower, [1.0, 3.0, 2.0]);
    let upper = tilt(upper, [1.0 + 1e-6, 2.0 - 1e-6, 5.0]);
    for draw_upper_first in [false, true] {
        let mut frame = Frame::new(8, 8);
        let mut written = 0;
        let order = if draw_upper_first {
            [(&upper, GREEN), (&lower, RED)]
        } else {
            [(&lower, RED), (&upper, GREEN)]
        };
        for (clip, color) in order {
            if let Coverage::Drawn { written: count, .. } = rasterizer::triangle(clip, &mut Paint(color), &mut frame) {
                written += count;
            }
        }
        assert_eq!(written, 64);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(frame.color_at(x, y), if y < x { RED } else { GREEN });
            }
        }
    }
}

#[test]
fn bands_merge_into_the_full_frame() {
    let (lower, upper) = halves();
    let mut full = Frame::new(8, 8);
    rasterizer::triangle(&lower, &mut Paint(RED), &mut full);
    rasterizer::triangle(&upper, &mut Paint(GREEN), &mut full);

    let mut merged = Frame::new(8, 8);
    for (y_begin, y_end) in [(0, 3), (3, 7), (7, 8)] {
        let mut band = Frame::band(8, y_begin, y_end);
        rasterizer::triangle(&lower, &mut Paint(RED), &mut band);
        rasterizer::triangle(&upper, &mut Paint(GREEN), &mut band);
        merged.merge_band(&band);
    }

    assert_eq!(merged.color().as_raw(), full.color().as_raw());
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(merged.depth_at(x, y), full.depth_at(x, y));
        }
    }
}

#[test]
fn triangle_outside_the_band_is_not_visited() {
    let mut band = Frame::band(8, 4, 8);
    let below = flat([(0.0, 0.0), (8.0, 0.0), (0.0, 3.0)]);
    assert_eq!(rasterizer::triangle(&below, &mut Paint(RED), &mut band), Coverage::Outside);
    assert!(band.color().as_raw().iter().all(|&c| c == BLACK[0]));
}

#[test]
fn winding_does_not_matter() {
    let mut ccw = Frame::new(6, 6);
    let mut cw = Frame::new(6, 6);
    rasterizer::triangle(&flat([(0.0, 0.0), (5.0, 1.0), (2.0, 5.0)]), &mut Paint(RED), &mut ccw);
    rasterizer::triangle(&flat([(0.0, 0.0), (2.0, 5.0), (5.0, 1.0)]), &mut Paint(RED), &mut cw);
    assert_eq!(ccw.color().as_raw(), cw.color().as_raw());
}

/// Bumpy grid over x, z in [-1, 1], two triangles per cell.
fn heightfield(cells: usize) -> TriangleSoup {
    let height = |x: f32, z: f32| 0.08 * (3.0 * x).sin() * (2.0 * z).cos() + 0.05 * x * z;
    let point = |i: usize, j: usize| {
        let x = -1.0 + 2.0 * i as f32 / cells as f32;
        let z = -1.0 + 2.0 * j as f32 / cells as f32;
        vector![x, height(x, z), z]
    };
    let mut soup = TriangleSoup::new();
    for i in 0..cells {
        for j in 0..cells {
            let (a, b, c, d) = (point(i, j), point(i + 1, j), point(i + 1, j + 1), point(i, j + 1));
            soup.push([a, b, c]);
            soup.push([a, c, d]);
        }
    }
    return soup;
}

#[test]
fn adjacent_faces_never_shade_a_pixel_twice() {
    // Seen from above, no face hides another: every covered pixel is written exactly once.
    let soup = heightfield(16);
    let face_count = soup.face_count();
    let mesh: SharedMesh = Arc::new(soup);
    let camera = Camera {
        eye: vector![0.3, 3.0, 0.6],
        up: vector![0.0, 0.0, -1.0],
        ..Camera::default()
    };
    for size in [97, 256] {
        let transforms = camera.transforms(size, size, 255.0).unwrap();
        let mut scene = Scene::new(size, size);
        let stats = scene.render(&mut FlatShader::new(mesh.clone(), WHITE), &transforms, face_count);

        let mut covered = 0;
        for y in 0..size {
            for x in 0..size {
                if scene.frame().depth_at(x, y) < FAR_DEPTH {
                    covered += 1;
                }
            }
        }
        assert_eq!(stats.skipped, 0);
        assert!(covered > 0);
        assert_eq!(stats.pixels_written, covered, "size {size}");
    }
}
