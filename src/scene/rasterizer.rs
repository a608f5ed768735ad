//! Triangle fill with z-buffering.
//!
//! Corners are snapped to a 1/256 pixel grid, and coverage is decided with exact integer edge
//! functions at pixel centers. A center lying exactly on an edge belongs to the triangle only if
//! that edge is a right or bottom edge of it (edges walked counter-clockwise, y up). Two triangles
//! sharing an edge see it in opposite directions, so exactly one of them owns every pixel on it:
//! no gaps, and no pixel shaded twice, whatever their depths are.

use log::trace;
use nalgebra as na;
use na::{Vector2, Vector3, Vector4};

use super::buffer::{Frame, BLACK};
use super::shader::{perspective_correct, Shader};

/// Twice the screen area under which a triangle is treated as a line or a point and skipped.
pub const DEGENERATE_AREA: f32 = 1e-6;

/// Corners are snapped to 1 / 2^SUBPIXEL_BITS of a pixel.
pub const SUBPIXEL_BITS: u32 = 8;

// Snapped coordinates stay within +-2^29 so edge function products fit in i64.
const MAX_SNAPPED: f32 = (1i64 << 29) as f32;

/// What happened to a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Rasterized, `tested` pixels were inside and reached the depth test, `written` of those
    /// survived it and the fragment shader.
    Drawn { tested: usize, written: usize },
    /// Zero area on screen.
    Degenerate,
    /// A corner has w <= 0, nothing is clipped so the whole triangle is dropped.
    BehindEye,
    /// Bounding box doesn't intersect the frame.
    Outside,
}

/// Point on the sub-pixel grid.
type Snapped = (i64, i64);

fn snap(v: f32) -> i64 {
    return (v * (1 << SUBPIXEL_BITS) as f32).round().clamp(-MAX_SNAPPED, MAX_SNAPPED) as i64;
}

/// Doubled signed area of (a, b, p), positive if p is to the left of a -> b.
fn edge_function(a: Snapped, b: Snapped, p: Snapped) -> i64 {
    return (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
}

/// Triangle prepared for coverage tests: snapped, wound counter-clockwise.
#[derive(Debug, Clone, Copy)]
struct EdgeSetup {
    corners: [Snapped; 3],
    area: i64,
    // Whether the edge opposite corner i keeps the pixel centers lying exactly on it.
    owns: [bool; 3],
    // Corners 1 and 2 were exchanged to fix the winding.
    swapped: bool,
}

impl EdgeSetup {
    /// `None` if the snapped triangle has no area.
    fn new(screen: &[Vector2<f32>; 3]) -> Option<Self> {
        let mut corners = screen.map(|p| (snap(p.x), snap(p.y)));
        let mut area = edge_function(corners[0], corners[1], corners[2]);
        if area == 0 {
            return None;
        }
        let swapped = area < 0;
        if swapped {
            corners.swap(1, 2);
            area = -area;
        }
        let owns = [0, 1, 2].map(|i| {
            let (a, b) = (corners[(i + 1) % 3], corners[(i + 2) % 3]);
            let (dx, dy) = (b.0 - a.0, b.1 - a.1);
            // Going up is a right edge, going right along a horizontal is a bottom edge.
            dy > 0 || (dy == 0 && dx > 0)
        });
        return Some(Self { corners, area, owns, swapped });
    }

    /// Barycentric weights of the center of pixel (x, y) in the caller's corner order, `None` if
    /// the pixel isn't covered.
    fn weights(&self, x: u32, y: u32) -> Option<Vector3<f32>> {
        let half = 1i64 << (SUBPIXEL_BITS - 1);
        let center = (((x as i64) << SUBPIXEL_BITS) + half, ((y as i64) << SUBPIXEL_BITS) + half);
        let [c0, c1, c2] = self.corners;
        let edges = [edge_function(c1, c2, center), edge_function(c2, c0, center), edge_function(c0, c1, center)];
        for i in 0..3 {
            if edges[i] < 0 || (edges[i] == 0 && !self.owns[i]) {
                return None;
            }
        }
        let area = self.area as f32;
        let (w0, w1, w2) = (edges[0] as f32 / area, edges[1] as f32 / area, edges[2] as f32 / area);
        if self.swapped {
            return Some(Vector3::new(w0, w2, w1));
        }
        return Some(Vector3::new(w0, w1, w2));
    }
}

/// Rasterizes one triangle given by its clip space corners (viewport applied, not divided by w)
/// into `frame`. The shader must already have seen `vertex` calls for all three corners.
pub fn triangle<S: Shader + ?Sized>(clip: &[Vector4<f32>; 3], shader: &mut S, frame: &mut Frame) -> Coverage {
    if clip.iter().any(|v| !(v.w > 0.0)) {
        trace!("skipping triangle behind the eye: {clip:?}");
        return Coverage::BehindEye;
    }
    let screen = clip.map(|v| Vector2::new(v.x / v.w, v.y / v.w));
    let float_area = (screen[1] - screen[0]).perp(&(screen[2] - screen[0]));
    let setup = match EdgeSetup::new(&screen) {
        Some(setup) if float_area.abs() >= DEGENERATE_AREA => setup,
        _ => {
            trace!("skipping degenerate triangle: {screen:?}");
            return Coverage::Degenerate;
        }
    };
    let inv_w = Vector3::new(1.0 / clip[0].w, 1.0 / clip[1].w, 1.0 / clip[2].w);
    let z_values = Vector3::new(clip[0].z, clip[1].z, clip[2].z);

    // Bounding box clamped to the frame, the only pixels ever looked at.
    let bounds = frame.bounds();
    let min_x = screen.iter().fold(f32::MAX, |acc, p| acc.min(p.x)).floor();
    let min_y = screen.iter().fold(f32::MAX, |acc, p| acc.min(p.y)).floor();
    let max_x = screen.iter().fold(f32::MIN, |acc, p| acc.max(p.x)).ceil();
    let max_y = screen.iter().fold(f32::MIN, |acc, p| acc.max(p.y)).ceil();
    let x_begin = min_x.max(bounds.x_min as f32) as u32;
    let y_begin = min_y.max(bounds.y_min as f32) as u32;
    // Exclusive ends.
    let x_end = (max_x + 1.0).min(bounds.x_max as f32).max(0.0) as u32;
    let y_end = (max_y + 1.0).min(bounds.y_max as f32).max(0.0) as u32;
    if x_begin >= x_end || y_begin >= y_end {
        return Coverage::Outside;
    }

    let mut tested = 0;
    let mut written = 0;
    for y in y_begin..y_end {
        for x in x_begin..x_end {
            let bar = match setup.weights(x, y) {
                Some(bar) => bar,
                None => continue,
            };
            tested += 1;
            let depth = z_values.dot(&perspective_correct(bar, inv_w));
            // Nearer wins, ties keep what is already there. NaN depth never passes.
            if !(depth < frame.depth_at(x, y)) {
                continue;
            }
            let mut color = BLACK;
            if shader.fragment(bar, &mut color) {
                continue;
            }
            frame.write(x, y, color, depth);
            written += 1;
        }
    }
    return Coverage::Drawn { tested, written };
}
