//! Frame level driver: vertex stage then rasterization, face by face.

pub mod buffer;
pub mod camera;
pub mod line;
pub mod model;
pub mod rasterizer;
pub mod shader;
pub mod util;

use std::fmt;
use std::sync::mpsc;

use log::{debug, error};
use nalgebra::Vector3;
use threadpool::ThreadPool;

use buffer::{Color, Frame};
use camera::Transforms;
use model::Mesh;
use rasterizer::Coverage;
use shader::Shader;

/// Counters of one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub faces: usize,
    /// Faces dropped for being degenerate or behind the eye.
    pub skipped: usize,
    /// Fragment writes, overwritten pixels counted every time.
    pub pixels_written: usize,
}

impl RenderStats {
    fn record(&mut self, coverage: Coverage) {
        self.faces += 1;
        match coverage {
            Coverage::Drawn { written, .. } => self.pixels_written += written,
            Coverage::Degenerate | Coverage::BehindEye => self.skipped += 1,
            Coverage::Outside => (),
        }
    }
}

/// Failure of a whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// Band jobs that never reported back, their rows are left cleared.
    LostBands { lost: usize, bands: usize },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LostBands { lost, bands } => write!(f, "{lost} of {bands} render bands failed"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Runs `shader` over faces `0..face_count` into `frame`.
fn draw_faces<S: Shader + ?Sized>(
    shader: &mut S,
    transforms: &Transforms,
    face_count: usize,
    frame: &mut Frame,
) -> RenderStats {
    let mut stats = RenderStats::default();
    for face in 0..face_count {
        let clip = [0, 1, 2].map(|slot| shader.vertex(transforms, face, slot));
        stats.record(rasterizer::triangle(&clip, shader, frame));
    }
    return stats;
}

/// Scene, holding the frame every render call draws into.
/// (0, 0) is the bottom left pixel.
pub struct Scene {
    pub width: u32,
    pub height: u32,
    frame: Frame,
}

impl Scene {
    pub fn new(width: u32, height: u32) -> Scene {
        return Scene { width, height, frame: Frame::new(width, height) };
    }

    pub fn frame(&self) -> &Frame {
        return &self.frame;
    }

    /// Sets every pixel to black and the z-buffer to far.
    pub fn clear(&mut self) {
        self.frame.clear();
    }

    /// Clears the frame and draws all faces on the calling thread.
    pub fn render<S: Shader + ?Sized>(&mut self, shader: &mut S, transforms: &Transforms, face_count: usize) -> RenderStats {
        self.frame.clear();
        let stats = draw_faces(shader, transforms, face_count, &mut self.frame);
        debug!("rendered {} faces, {} skipped, {} pixel writes", stats.faces, stats.skipped, stats.pixels_written);
        return stats;
    }

    /// Same result as [`Scene::render`], computed on `pool`. The frame is cut into one horizontal
    /// band per worker, each band is owned by exactly one job that rasterizes every face clipped
    /// to its rows with its own copy of the shader. Finished bands are merged back.
    ///
    /// A job that panics takes its band with it, the frame is then incomplete and an error is
    /// returned instead of the stats.
    pub fn render_parallel<S>(
        &mut self,
        pool: &ThreadPool,
        shader: &S,
        transforms: &Transforms,
        face_count: usize,
    ) -> Result<RenderStats, RenderError>
    where
        S: Shader + Clone + Send + 'static,
    {
        let band_count = (pool.max_count() as u32).clamp(1, self.height.max(1));
        let band_height = (self.height + band_count - 1) / band_count;
        let (sender, receiver) = mpsc::channel();
        let mut jobs = 0;
        for y_begin in (0..self.height).step_by(band_height.max(1) as usize) {
            let y_end = (y_begin + band_height).min(self.height);
            let width = self.width;
            let mut shader = shader.clone();
            let transforms = transforms.clone();
            let sender = sender.clone();
            pool.execute(move || {
                let mut band = Frame::band(width, y_begin, y_end);
                let stats = draw_faces(&mut shader, &transforms, face_count, &mut band);
                // Receiver outlives every job, a failed send means the render was abandoned.
                let _ = sender.send((band, stats));
            });
            jobs += 1;
        }
        // Panicking jobs drop their sender unsent, the channel closes once all are gone.
        drop(sender);

        self.frame.clear();
        let mut stats = RenderStats { faces: face_count, ..Default::default() };
        let mut received = 0;
        for (band, band_stats) in receiver.iter() {
            self.frame.merge_band(&band);
            // Skips don't depend on the band, writes add up to the sequential count.
            stats.skipped = stats.skipped.max(band_stats.skipped);
            stats.pixels_written += band_stats.pixels_written;
            received += 1;
        }
        if received < jobs {
            let failure = RenderError::LostBands { lost: jobs - received, bands: jobs };
            error!("frame incomplete: {failure}");
            return Err(failure);
        }
        debug!(
            "rendered {} faces in {} bands, {} skipped, {} pixel writes",
            stats.faces, jobs, stats.skipped, stats.pixels_written
        );
        return Ok(stats);
    }

    /// Clears the frame and draws the edges of every face of `mesh` as lines. Faces with a corner
    /// behind the eye are skipped, `pixels_written` counts line pixels.
    pub fn render_wireframe(&mut self, mesh: &dyn Mesh, transforms: &Transforms, color: Color) -> RenderStats {
        self.frame.clear();
        let mut stats = RenderStats::default();
        for face in 0..mesh.face_count() {
            stats.faces += 1;
            let clip = [0, 1, 2].map(|slot| transforms.to_clip(mesh.position(face, slot)));
            if clip.iter().any(|v| !(v.w > 0.0)) {
                stats.skipped += 1;
                continue;
            }
            let screen = clip.map(|v| Vector3::new(v.x / v.w, v.y / v.w, v.z));
            for i in 0..3 {
                stats.pixels_written += line::line(screen[i], screen[(i + 1) % 3], color, &mut self.frame);
            }
        }
        debug!("wireframe of {} faces, {} skipped, {} pixel writes", stats.faces, stats.skipped, stats.pixels_written);
        return stats;
    }
}
