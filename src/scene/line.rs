//! Line segments, used for wireframe output.

use nalgebra as na;
use na::Vector3;

use super::buffer::{Color, Frame};

// Keeps the integer stepping below far from overflow.
const MAX_COORDINATE: f32 = (1i64 << 24) as f32;

/// Draws the segment between screen points `a` and `b` (x and y in pixels, z depth) with
/// Bresenham stepping along the major axis. Pixels outside the frame are skipped, depth is blended
/// linearly in screen space and tested like triangle fragments. Returns the number of pixels written.
///
/// The segment is normalized to run left to right (bottom to top when steep) before stepping, so
/// `line(a, b)` and `line(b, a)` touch exactly the same pixels.
pub fn line(a: Vector3<f32>, b: Vector3<f32>, color: Color, frame: &mut Frame) -> usize {
    if !a.iter().chain(b.iter()).all(|v| v.is_finite()) {
        return 0;
    }
    let to_pixel = |v: f32| v.floor().clamp(-MAX_COORDINATE, MAX_COORDINATE) as i64;
    let (mut x_0, mut y_0, mut z_0) = (to_pixel(a.x), to_pixel(a.y), a.z);
    let (mut x_1, mut y_1, mut z_1) = (to_pixel(b.x), to_pixel(b.y), b.z);

    // Steep lines are walked along y, by swapping the axes.
    let steep = (x_1 - x_0).abs() < (y_1 - y_0).abs();
    if steep {
        std::mem::swap(&mut x_0, &mut y_0);
        std::mem::swap(&mut x_1, &mut y_1);
    }
    if x_0 > x_1 {
        std::mem::swap(&mut x_0, &mut x_1);
        std::mem::swap(&mut y_0, &mut y_1);
        std::mem::swap(&mut z_0, &mut z_1);
    }

    let bounds = frame.bounds();
    let (x_min, y_min) = (bounds.x_min as i64, bounds.y_min as i64);
    let (x_max, y_max) = (bounds.x_max as i64, bounds.y_max as i64);
    let (major_min, major_end) = if steep { (y_min, y_max) } else { (x_min, x_max) };

    let dx = x_1 - x_0;
    let dy = y_1 - y_0;
    let mut written = 0;
    for x in x_0.max(major_min)..=x_1.min(major_end - 1) {
        let step = x - x_0;
        // Nearest minor axis pixel, halves rounded up.
        let (y, t) = match dx {
            0 => (y_0, 0.0),
            _ => (y_0 + (2 * step * dy + dx).div_euclid(2 * dx), step as f32 / dx as f32),
        };
        let (px, py) = if steep { (y, x) } else { (x, y) };
        if px < x_min || px >= x_max || py < y_min || py >= y_max {
            continue;
        }
        let (px, py) = (px as u32, py as u32);
        let depth = z_0 + (z_1 - z_0) * t;
        if depth < frame.depth_at(px, py) {
            frame.write(px, py, color, depth);
            written += 1;
        }
    }
    return written;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use na::vector;

    use crate::scene::buffer::BLACK;

    const RED: Color = Rgb([255, 0, 0]);

    fn lit(frame: &Frame, width: u32, height: u32) -> Vec<(u32, u32)> {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if frame.color_at(x, y) != BLACK {
                    pixels.push((x, y));
                }
            }
        }
        return pixels;
    }

    #[test]
    fn horizontal_line() {
        let mut frame = Frame::new(8, 8);
        let written = line(vector![0.5, 2.5, 1.0], vector![5.5, 2.5, 1.0], RED, &mut frame);
        assert_eq!(written, 6);
        assert_eq!(lit(&frame, 8, 8), (0..6).map(|x| (x, 2)).collect::<Vec<_>>());
    }

    #[test]
    fn steep_line_has_one_pixel_per_row() {
        let mut frame = Frame::new(8, 8);
        let written = line(vector![1.0, 0.0, 1.0], vector![3.0, 6.0, 1.0], RED, &mut frame);
        assert_eq!(written, 7);
        let pixels = lit(&frame, 8, 8);
        assert_eq!(pixels.len(), 7);
        for (row, &(x, y)) in pixels.iter().enumerate() {
            assert_eq!(y, row as u32);
            assert!((1..=3).contains(&x));
        }
        assert_eq!(pixels.first(), Some(&(1, 0)));
        assert_eq!(pixels.last(), Some(&(3, 6)));
    }

    #[test]
    fn reversed_lines_touch_the_same_pixels() {
        let ends = [
            (vector![0.0, 0.0, 1.0], vector![7.0, 3.0, 1.0]),
            (vector![6.0, 0.0, 1.0], vector![1.0, 7.0, 1.0]),
            (vector![0.0, 5.0, 1.0], vector![7.0, 1.0, 1.0]),
            (vector![2.0, 7.0, 1.0], vector![3.0, 0.0, 1.0]),
        ];
        for (a, b) in ends {
            let mut forward = Frame::new(8, 8);
            let mut backward = Frame::new(8, 8);
            line(a, b, RED, &mut forward);
            line(b, a, RED, &mut backward);
            assert_eq!(lit(&forward, 8, 8), lit(&backward, 8, 8), "{a:?} -> {b:?}");
        }
    }

    #[test]
    fn line_is_clipped_to_frame() {
        let mut frame = Frame::new(4, 4);
        let written = line(vector![-100.0, 1.0, 1.0], vector![100.0, 1.0, 1.0], RED, &mut frame);
        assert_eq!(written, 4);
        assert_eq!(line(vector![10.0, 10.0, 1.0], vector![20.0, 12.0, 1.0], RED, &mut frame), 0);
    }

    #[test]
    fn line_depth_is_tested() {
        let mut frame = Frame::new(8, 8);
        line(vector![0.0, 0.0, 0.0], vector![7.0, 0.0, 7.0], RED, &mut frame);
        assert!((frame.depth_at(3, 0) - 3.0).abs() < 1e-6);
        // Behind the first one, nothing changes.
        assert_eq!(line(vector![0.0, 0.0, 10.0], vector![7.0, 0.0, 10.0], Rgb([1, 1, 1]), &mut frame), 0);
        assert_eq!(frame.color_at(5, 0), RED);
    }
}
