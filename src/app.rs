use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time;

use image::RgbImage;
use log::{debug, info};
use nalgebra as na;
use na::{Vector3, Vector4};
use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};
use threadpool::ThreadPool;

use crate::scene::buffer::{Color, WHITE};
use crate::scene::camera::{Camera, Transforms};
use crate::scene::model::{load_texture, Mesh, ObjModel, SharedMesh};
use crate::scene::shader::{FlatShader, GouraudShader, Shader, TexturedShader};
use crate::scene::{RenderError, RenderStats, Scene};

/// Which shader pipeline draws the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Flat,
    Gouraud,
    Textured,
    /// Face edges only, no fill.
    Wireframe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownShader(pub String);

impl fmt::Display for UnknownShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown shader \"{}\", expected flat, gouraud, textured or wireframe", self.0)
    }
}

impl std::error::Error for UnknownShader {}

impl std::str::FromStr for ShaderKind {
    type Err = UnknownShader;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s {
            "flat" => Ok(Self::Flat),
            "gouraud" | "default" => Ok(Self::Gouraud),
            "textured" => Ok(Self::Textured),
            "wireframe" => Ok(Self::Wireframe),
            _ => Err(UnknownShader(s.to_string())),
        };
    }
}

/// Everything a run needs, filled in by `main` from the command line.
#[derive(Debug, Clone)]
pub struct Params {
    pub width: u32,
    pub height: u32,
    pub depth: f32,
    pub model_path: PathBuf,
    pub texture_path: Option<PathBuf>,
    pub output_path: PathBuf,
    pub depth_output_path: Option<PathBuf>,
    pub shader: ShaderKind,
    pub threads: usize, // 1 renders on the calling thread.
    pub show: bool,
    pub print_fps: bool,
    pub camera: Camera,
    pub light_direction: Vector3<f32>,
}

impl Default for Params {
    fn default() -> Self {
        return Self {
            width: 800,
            height: 800,
            depth: 255.0,
            model_path: PathBuf::from("assets/model.obj"),
            texture_path: None,
            output_path: PathBuf::from("output.png"),
            depth_output_path: None,
            shader: ShaderKind::Gouraud,
            threads: 1,
            show: false,
            print_fps: false,
            camera: Camera::default(),
            light_direction: Vector3::new(1.0, 1.0, 1.0),
        };
    }
}

/// The shader picked at startup. An enum rather than a trait object so the parallel renderer
/// can clone it into workers.
#[derive(Clone)]
pub enum AppShader {
    Flat(FlatShader),
    Gouraud(GouraudShader),
    Textured(TexturedShader),
}

/// How faces end up on screen: filled by a shader, or outlined.
#[derive(Clone)]
pub enum Pipeline {
    Shaded(AppShader),
    Wireframe(SharedMesh),
}

impl Pipeline {
    pub fn new(
        kind: ShaderKind,
        mesh: SharedMesh,
        texture: Option<Arc<RgbImage>>,
        light_direction: Vector3<f32>,
    ) -> Self {
        let shader = match (kind, texture) {
            (ShaderKind::Wireframe, _) => return Self::Wireframe(mesh),
            (ShaderKind::Flat, _) => AppShader::Flat(FlatShader::new(mesh, WHITE)),
            (ShaderKind::Textured, Some(texture)) => {
                AppShader::Textured(TexturedShader::new(mesh, texture, light_direction))
            }
            (ShaderKind::Textured, None) => {
                info!("no texture given, falling back to gouraud shading");
                AppShader::Gouraud(GouraudShader::new(mesh, light_direction))
            }
            (ShaderKind::Gouraud, _) => AppShader::Gouraud(GouraudShader::new(mesh, light_direction)),
        };
        return Self::Shaded(shader);
    }
}

impl Shader for AppShader {
    fn vertex(&mut self, transforms: &Transforms, face: usize, slot: usize) -> Vector4<f32> {
        return match self {
            Self::Flat(shader) => shader.vertex(transforms, face, slot),
            Self::Gouraud(shader) => shader.vertex(transforms, face, slot),
            Self::Textured(shader) => shader.vertex(transforms, face, slot),
        };
    }

    fn fragment(&mut self, bar: Vector3<f32>, color: &mut Color) -> bool {
        return match self {
            Self::Flat(shader) => shader.fragment(bar, color),
            Self::Gouraud(shader) => shader.fragment(bar, color),
            Self::Textured(shader) => shader.fragment(bar, color),
        };
    }
}

/// Draws one frame, on the pool if there is one. Wireframes are always drawn on the calling thread.
fn render_frame(
    scene: &mut Scene,
    pool: Option<&ThreadPool>,
    pipeline: &mut Pipeline,
    transforms: &Transforms,
    face_count: usize,
) -> Result<RenderStats, RenderError> {
    return match (pipeline, pool) {
        (Pipeline::Wireframe(mesh), _) => Ok(scene.render_wireframe(&**mesh, transforms, WHITE)),
        (Pipeline::Shaded(shader), Some(pool)) => scene.render_parallel(pool, &*shader, transforms, face_count),
        (Pipeline::Shaded(shader), None) => Ok(scene.render(shader, transforms, face_count)),
    };
}

/// Helper, defining exit event to be an Escape key press.
fn is_exit_event(window_event: event::WindowEvent) -> bool {
    if let event::WindowEvent::KeyboardInput(event) = window_event {
        if event.input.key_code == Some(event::VirtualKeyCode::Escape) && event.input.state.is_released() {
            return true;
        }
    }

    return false;
}

/// Loads the model, then either renders a single frame to `output_path` or, with `show` set,
/// opens a window with the camera orbiting the model until Escape is pressed.
pub fn run(params: Params) -> Result<(), Box<dyn std::error::Error>> {
    let model = ObjModel::load(&params.model_path)?;
    info!("loaded {}: {} vertices, {} faces", params.model_path.display(), model.vertex_count(), model.face_count());
    let face_count = model.face_count();
    let mesh: SharedMesh = Arc::new(model);

    let texture = match &params.texture_path {
        Some(path) => Some(load_texture(path)?),
        None => None,
    };
    let mut pipeline = Pipeline::new(params.shader, mesh, texture, params.light_direction);
    let pool = (params.threads > 1).then(|| ThreadPool::new(params.threads));
    let mut scene = Scene::new(params.width, params.height);

    if params.show {
        return show(&params, &mut scene, pool.as_ref(), &mut pipeline, face_count);
    }

    let transforms = params.camera.transforms(params.width, params.height, params.depth)?;
    let time_begin = time::Instant::now();
    let stats = render_frame(&mut scene, pool.as_ref(), &mut pipeline, &transforms, face_count)?;
    info!(
        "rendered {} faces ({} skipped, {} pixel writes) in {:?}",
        stats.faces,
        stats.skipped,
        stats.pixels_written,
        time_begin.elapsed()
    );

    scene.frame().color().to_image().save(&params.output_path)?;
    info!("wrote {}", params.output_path.display());
    if let Some(path) = &params.depth_output_path {
        scene.frame().depth().to_image().save(path)?;
        info!("wrote {}", path.display());
    }

    return Ok(());
}

/// Launches the preview window and keeps rendering into it until Escape is released.
fn show(
    params: &Params,
    scene: &mut Scene,
    pool: Option<&ThreadPool>,
    pipeline: &mut Pipeline,
    face_count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let window_options: WindowOptions = WindowOptions {
        size: Some([params.width, params.height]),
        ..Default::default()
    };
    let window = create_window("output", window_options)?;
    let event_channel = window.event_channel()?;

    let mut exit = false;
    let time_begin = time::Instant::now();
    let mut frame_counter_time_begin = time::Instant::now();
    let mut frame_counter: u32 = 0;
    while !exit {
        let passed_time = time_begin.elapsed().as_secs_f32();

        // Full turn every ten seconds.
        let camera = params.camera.orbit(passed_time * std::f32::consts::TAU / 10.0)?;
        let transforms = camera.transforms(params.width, params.height, params.depth)?;
        let stats = render_frame(scene, pool, pipeline, &transforms, face_count)?;
        debug!("frame at {passed_time:.2}s: {stats:?}");

        // Window wants rows top-down, the frame buffer keeps them bottom-up.
        let image = scene.frame().color().to_image();
        let image_data = ImageView::new(ImageInfo::rgb8(params.width, params.height), image.as_raw());
        window.set_image("image", image_data)?;

        // Unloading all the garbage from event channel, that has piled up, looking for exit event.
        exit = event_channel.try_iter().fold(false, |was_exit_event, window_event| {
            is_exit_event(window_event) || was_exit_event
        });

        if params.print_fps {
            // Counting frames to printout stats every second.
            frame_counter += 1;
            if frame_counter_time_begin.elapsed().as_secs_f32() > 1.0 {
                println!("FPS --- {}", frame_counter);
                frame_counter_time_begin = time::Instant::now();
                frame_counter = 0;
            }
        }
    }

    return Ok(());
}
