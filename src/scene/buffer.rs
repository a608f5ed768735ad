use image::{GrayImage, Luma, Rgb, RgbImage};

/// rgb8 color of a single pixel.
pub type Color = Rgb<u8>;

pub const BLACK: Color = Rgb([0, 0, 0]);
pub const WHITE: Color = Rgb([255, 255, 255]);

/// Depth of an untouched pixel, anything drawn is nearer.
pub const FAR_DEPTH: f32 = f32::MAX;

/// Color part of the frame. (0, 0) is the bottom left pixel, rows are stored top first so the
/// underlying image can be handed to an encoder or a window as is.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    image: RgbImage,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        return Self { image: RgbImage::new(width, height) };
    }

    pub fn width(&self) -> u32 {
        return self.image.width();
    }

    pub fn height(&self) -> u32 {
        return self.image.height();
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        // Forcing (0, 0) to be in the bottom left here by inverting y.
        let row = self.height() - 1 - y;
        self.image.put_pixel(x, row, color);
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Color {
        let row = self.height() - 1 - y;
        return *self.image.get_pixel(x, row);
    }

    pub fn clear(&mut self, color: Color) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// Raw rgb8 data, top row first.
    pub fn as_raw(&self) -> &[u8] {
        return self.image.as_raw();
    }

    pub fn to_image(&self) -> RgbImage {
        return self.image.clone();
    }
}

/// Per-pixel nearest depth, same layout as the [`FrameBuffer`] it belongs to.
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        return Self {
            width,
            height,
            samples: vec![FAR_DEPTH; (width * height) as usize],
        };
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        return self.samples[self.index(x, y)];
    }

    pub fn clear(&mut self) {
        self.samples.fill(FAR_DEPTH);
    }

    /// Grayscale picture of the buffer, nearest sample is white, farthest drawn one is dark grey
    /// and untouched pixels stay black.
    pub fn to_image(&self) -> GrayImage {
        let (near, far) = self
            .samples
            .iter()
            .filter(|&&z| z < FAR_DEPTH)
            .fold((f32::MAX, f32::MIN), |(lo, hi), &z| (lo.min(z), hi.max(z)));
        let range = (far - near).max(f32::EPSILON);
        let mut image = GrayImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let z = self.get(x, y);
                let value = if z < FAR_DEPTH {
                    (255.0 - 223.0 * (z - near) / range) as u8
                } else {
                    0
                };
                image.put_pixel(x, self.height - 1 - y, Luma([value]));
            }
        }
        return image;
    }

    fn set(&mut self, x: u32, y: u32, depth: f32) {
        let index = self.index(x, y);
        self.samples[index] = depth;
    }

    fn index(&self, x: u32, y: u32) -> usize {
        return (x + y * self.width) as usize;
    }
}

/// Pixel rectangle a frame covers, in whole-image coordinates, ends exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl PixelBounds {
    pub fn is_empty(&self) -> bool {
        return self.x_min >= self.x_max || self.y_min >= self.y_max;
    }
}

/// Color and depth buffers of one render target. Both are only written through [`Frame::write`],
/// so the color at a pixel always belongs to the depth stored there.
///
/// A frame is either the whole image or a horizontal band of it, see [`Frame::band`].
#[derive(Debug, Clone)]
pub struct Frame {
    color: FrameBuffer,
    depth: DepthBuffer,
    y_offset: u32,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        return Self {
            color: FrameBuffer::new(width, height),
            depth: DepthBuffer::new(width, height),
            y_offset: 0,
        };
    }

    /// Rows `y_begin..y_end` of a `width` wide image. Pixel coordinates passed to the band are
    /// still whole-image coordinates.
    pub fn band(width: u32, y_begin: u32, y_end: u32) -> Self {
        let height = y_end.saturating_sub(y_begin);
        return Self {
            color: FrameBuffer::new(width, height),
            depth: DepthBuffer::new(width, height),
            y_offset: y_begin,
        };
    }

    pub fn bounds(&self) -> PixelBounds {
        return PixelBounds {
            x_min: 0,
            y_min: self.y_offset,
            x_max: self.color.width(),
            y_max: self.y_offset + self.color.height(),
        };
    }

    pub fn color(&self) -> &FrameBuffer {
        return &self.color;
    }

    pub fn depth(&self) -> &DepthBuffer {
        return &self.depth;
    }

    pub fn color_at(&self, x: u32, y: u32) -> Color {
        return self.color.get_pixel(x, y - self.y_offset);
    }

    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        return self.depth.get(x, y - self.y_offset);
    }

    /// Stores a fragment, color and depth together.
    pub fn write(&mut self, x: u32, y: u32, color: Color, depth: f32) {
        let local_y = y - self.y_offset;
        self.color.set_pixel(x, local_y, color);
        self.depth.set(x, local_y, depth);
    }

    pub fn clear(&mut self) {
        self.color.clear(BLACK);
        self.depth.clear();
    }

    /// Copies a band rendered elsewhere into this frame. Band rows outside this frame are ignored.
    pub fn merge_band(&mut self, band: &Frame) {
        let own = self.bounds();
        let other = band.bounds();
        let y_begin = own.y_min.max(other.y_min);
        let y_end = own.y_max.min(other.y_max);
        let x_end = own.x_max.min(other.x_max);
        for y in y_begin..y_end {
            for x in 0..x_end {
                self.write(x, y, band.color_at(x, y), band.depth_at(x, y));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_is_bottom_left() {
        let mut buffer = FrameBuffer::new(2, 3);
        let red = Rgb([255, 0, 0]);
        buffer.set_pixel(0, 0, red);
        assert_eq!(buffer.get_pixel(0, 0), red);
        // Bottom row is the last one in the exported image.
        assert_eq!(*buffer.to_image().get_pixel(0, 2), red);
        assert_eq!(*buffer.to_image().get_pixel(0, 0), BLACK);
    }

    #[test]
    fn new_frame_is_black_and_far() {
        let frame = Frame::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(frame.color_at(x, y), BLACK);
                assert_eq!(frame.depth_at(x, y), FAR_DEPTH);
            }
        }
    }

    #[test]
    fn write_updates_color_and_depth_together() {
        let mut frame = Frame::new(3, 3);
        frame.write(1, 2, WHITE, 0.25);
        assert_eq!(frame.color_at(1, 2), WHITE);
        assert_eq!(frame.depth_at(1, 2), 0.25);
        frame.clear();
        assert_eq!(frame.color_at(1, 2), BLACK);
        assert_eq!(frame.depth_at(1, 2), FAR_DEPTH);
    }

    #[test]
    fn bands_merge_back_into_place() {
        let mut frame = Frame::new(4, 6);
        let mut low = Frame::band(4, 0, 3);
        let mut high = Frame::band(4, 3, 6);
        assert_eq!(high.bounds(), PixelBounds { x_min: 0, y_min: 3, x_max: 4, y_max: 6 });
        low.write(2, 1, WHITE, 3.0);
        high.write(3, 5, Rgb([10, 20, 30]), 4.0);
        frame.merge_band(&low);
        frame.merge_band(&high);
        assert_eq!(frame.color_at(2, 1), WHITE);
        assert_eq!(frame.depth_at(2, 1), 3.0);
        assert_eq!(frame.color_at(3, 5), Rgb([10, 20, 30]));
        assert_eq!(frame.depth_at(3, 5), 4.0);
        assert_eq!(frame.depth_at(0, 0), FAR_DEPTH);
    }

    #[test]
    fn depth_image_marks_nearest_brightest() {
        let mut frame = Frame::new(3, 1);
        frame.write(0, 0, WHITE, 1.0);
        frame.write(1, 0, WHITE, 2.0);
        let image = frame.depth().to_image();
        assert_eq!(image.get_pixel(0, 0).0[0], 255);
        assert_eq!(image.get_pixel(1, 0).0[0], 32);
        assert_eq!(image.get_pixel(2, 0).0[0], 0);
    }
}
