//! Mesh data the vertex stage reads from.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use image::RgbImage;
use nalgebra as na;
use na::{vector, Vector2, Vector3};
use obj::raw::object::Polygon;
use obj::raw::{parse_obj, RawObj};
use obj::ObjError;

use crate::geometry::VectorExt;

/// Access to per-corner attributes of a triangle mesh. Indices are trusted, implementations may
/// panic on out of range faces or slots.
pub trait Mesh {
    fn vertex_count(&self) -> usize;
    fn face_count(&self) -> usize;
    fn position(&self, face: usize, slot: usize) -> Vector3<f32>;
    fn normal(&self, face: usize, slot: usize) -> Vector3<f32>;
    fn uv(&self, face: usize, slot: usize) -> Vector2<f32>;
}

/// Mesh handle shaders keep, cheap to clone into worker threads.
pub type SharedMesh = Arc<dyn Mesh + Send + Sync>;

#[derive(Debug)]
pub enum ModelError {
    Io(std::io::Error),
    Parse(ObjError),
    Texture(image::ImageError),
    /// A face refers to a position, uv or normal the file doesn't have.
    BadIndex { face: usize, index: usize },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse(e) => write!(f, "OBJ parse error: {e}"),
            Self::Texture(e) => write!(f, "texture error: {e}"),
            Self::BadIndex { face, index } => write!(f, "face {face} refers to missing element {index}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Texture(e) => Some(e),
            Self::BadIndex { .. } => None,
        }
    }
}

impl From<std::io::Error> for ModelError {
    fn from(e: std::io::Error) -> Self {
        return Self::Io(e);
    }
}

impl From<ObjError> for ModelError {
    fn from(e: ObjError) -> Self {
        return Self::Parse(e);
    }
}

impl From<image::ImageError> for ModelError {
    fn from(e: image::ImageError) -> Self {
        return Self::Texture(e);
    }
}

/// Loads a diffuse texture as rgb8.
pub fn load_texture<P: AsRef<Path>>(path: P) -> Result<Arc<RgbImage>, ModelError> {
    return Ok(Arc::new(image::open(path)?.to_rgb8()));
}

/// One face corner, indices into the attribute arrays.
#[derive(Debug, Clone, Copy)]
struct Corner {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

/// Triangulated Wavefront OBJ model.
#[derive(Debug, Clone)]
pub struct ObjModel {
    positions: Vec<Vector3<f32>>,
    uvs: Vec<Vector2<f32>>,
    normals: Vec<Vector3<f32>>,
    faces: Vec<[Corner; 3]>,
    face_normals: Vec<Vector3<f32>>, // Used for corners without a normal in the file.
}

impl ObjModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        return Self::from_reader(BufReader::new(File::open(path)?));
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ModelError> {
        return Self::from_raw(parse_obj(reader)?);
    }

    fn from_raw(raw: RawObj) -> Result<Self, ModelError> {
        let positions: Vec<Vector3<f32>> = raw.positions.iter().map(|p| vector![p.0, p.1, p.2]).collect();
        let uvs: Vec<Vector2<f32>> = raw.tex_coords.iter().map(|t| vector![t.0, t.1]).collect();
        let normals: Vec<Vector3<f32>> = raw.normals.iter().map(|n| vector![n.0, n.1, n.2]).collect();

        let mut faces = Vec::with_capacity(raw.polygons.len());
        for polygon in &raw.polygons {
            let corners: Vec<Corner> = match polygon {
                Polygon::P(v) => v.iter().map(|&p| Corner { position: p, uv: None, normal: None }).collect(),
                Polygon::PT(v) => v.iter().map(|&(p, t)| Corner { position: p, uv: Some(t), normal: None }).collect(),
                Polygon::PN(v) => v.iter().map(|&(p, n)| Corner { position: p, uv: None, normal: Some(n) }).collect(),
                Polygon::PTN(v) => v
                    .iter()
                    .map(|&(p, t, n)| Corner { position: p, uv: Some(t), normal: Some(n) })
                    .collect(),
            };
            // Fan triangulation, quads and convex n-gons come out right.
            for i in 1..corners.len().saturating_sub(1) {
                faces.push([corners[0], corners[i], corners[i + 1]]);
            }
        }

        for (face, corners) in faces.iter().enumerate() {
            for corner in corners {
                let checks = [
                    (Some(corner.position), positions.len()),
                    (corner.uv, uvs.len()),
                    (corner.normal, normals.len()),
                ];
                for (index, available) in checks {
                    if let Some(index) = index.filter(|&index| index >= available) {
                        return Err(ModelError::BadIndex { face, index });
                    }
                }
            }
        }

        let face_normals = faces
            .iter()
            .map(|[a, b, c]| {
                let (a, b, c) = (positions[a.position], positions[b.position], positions[c.position]);
                (b - a).cross(&(c - a)).unit().unwrap_or_else(|_| Vector3::zeros())
            })
            .collect();

        return Ok(Self { positions, uvs, normals, faces, face_normals });
    }
}

impl Mesh for ObjModel {
    fn vertex_count(&self) -> usize {
        return self.positions.len();
    }

    fn face_count(&self) -> usize {
        return self.faces.len();
    }

    fn position(&self, face: usize, slot: usize) -> Vector3<f32> {
        return self.positions[self.faces[face][slot].position];
    }

    fn normal(&self, face: usize, slot: usize) -> Vector3<f32> {
        return match self.faces[face][slot].normal {
            Some(index) => self.normals[index],
            None => self.face_normals[face],
        };
    }

    fn uv(&self, face: usize, slot: usize) -> Vector2<f32> {
        return match self.faces[face][slot].uv {
            Some(index) => self.uvs[index],
            None => Vector2::zeros(),
        };
    }
}

/// Unindexed in-memory mesh, every face owns its three corners.
#[derive(Debug, Clone, Default)]
pub struct TriangleSoup {
    positions: Vec<[Vector3<f32>; 3]>,
    normals: Vec<[Vector3<f32>; 3]>,
    uvs: Vec<[Vector2<f32>; 3]>,
}

impl TriangleSoup {
    pub fn new() -> Self {
        return Self::default();
    }

    /// Adds a face with its geometric normal at every corner and zero uvs.
    pub fn push(&mut self, corners: [Vector3<f32>; 3]) {
        let [a, b, c] = corners;
        let normal = (b - a).cross(&(c - a)).unit().unwrap_or_else(|_| Vector3::zeros());
        self.push_with_attributes(corners, [normal; 3], [Vector2::zeros(); 3]);
    }

    pub fn push_with_attributes(
        &mut self,
        corners: [Vector3<f32>; 3],
        normals: [Vector3<f32>; 3],
        uvs: [Vector2<f32>; 3],
    ) {
        self.positions.push(corners);
        self.normals.push(normals);
        self.uvs.push(uvs);
    }
}

impl Mesh for TriangleSoup {
    fn vertex_count(&self) -> usize {
        return 3 * self.positions.len();
    }

    fn face_count(&self) -> usize {
        return self.positions.len();
    }

    fn position(&self, face: usize, slot: usize) -> Vector3<f32> {
        return self.positions[face][slot];
    }

    fn normal(&self, face: usize, slot: usize) -> Vector3<f32> {
        return self.normals[face][slot];
    }

    fn uv(&self, face: usize, slot: usize) -> Vector2<f32> {
        return self.uvs[face][slot];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn quad_is_split_into_two_triangles() {
        let model = ObjModel::from_reader(QUAD.as_bytes()).unwrap();
        assert_eq!(model.vertex_count(), 4);
        assert_eq!(model.face_count(), 2);
        assert_eq!(model.position(1, 0), vector![-1.0, -1.0, 0.0]);
        assert_eq!(model.position(1, 2), vector![-1.0, 1.0, 0.0]);
        assert_eq!(model.uv(0, 2), vector![1.0, 1.0]);
        assert_eq!(model.normal(1, 1), vector![0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_normals_fall_back_to_face_normal() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let model = ObjModel::from_reader(source.as_bytes()).unwrap();
        assert_eq!(model.face_count(), 1);
        assert!((model.normal(0, 0) - vector![0.0, 0.0, 1.0]).norm() < 1e-6);
        assert_eq!(model.uv(0, 1), Vector2::zeros());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let source = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        let result = ObjModel::from_reader(source.as_bytes());
        // Either the parser or our own check catches it, it just must not load.
        assert!(result.is_err());
    }

    #[test]
    fn bad_index_names_the_missing_element() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 3/1/1\n";
        let mut raw = parse_obj(source.as_bytes()).unwrap();
        raw.polygons[0] = Polygon::PTN(vec![(0, 0, 0), (1, 0, 0), (2, 0, 4)]);
        assert!(matches!(ObjModel::from_raw(raw), Err(ModelError::BadIndex { face: 0, index: 4 })));

        let mut raw = parse_obj(source.as_bytes()).unwrap();
        raw.polygons[0] = Polygon::PT(vec![(0, 0), (1, 7), (2, 0)]);
        assert!(matches!(ObjModel::from_raw(raw), Err(ModelError::BadIndex { face: 0, index: 7 })));
    }

    #[test]
    fn soup_computes_face_normals() {
        let mut soup = TriangleSoup::new();
        soup.push([vector![0.0, 0.0, 0.0], vector![0.0, 0.0, 1.0], vector![0.0, 1.0, 0.0]]);
        assert_eq!(soup.face_count(), 1);
        assert_eq!(soup.vertex_count(), 3);
        assert!((soup.normal(0, 2) - vector![-1.0, 0.0, 0.0]).norm() < 1e-6);
    }
}
