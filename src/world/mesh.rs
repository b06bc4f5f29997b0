//! Triangle meshes with per-vertex normals
//!
//! Pure data plus a few builders. Meshes are validated once at construction
//! so the renderer can index without checks.

use std::f32::consts::PI;

use glam::{Vec3, Vec4};

use crate::rasterizer::{Face, NormalMesh};

/// Error type for mesh construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    NormalCountMismatch { vertices: usize, normals: usize },
    IndexOutOfRange { face: usize, index: usize, vertex_count: usize },
    TooFewSegments(usize),
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::NormalCountMismatch { vertices, normals } => {
                write!(f, "Mesh error: {} vertices but {} normals", vertices, normals)
            }
            MeshError::IndexOutOfRange { face, index, vertex_count } => {
                write!(f, "Mesh error: face {} uses index {} (only {} vertices)", face, index, vertex_count)
            }
            MeshError::TooFewSegments(n) => write!(f, "Mesh error: sphere needs at least 3 segments, got {}", n),
        }
    }
}

impl std::error::Error for MeshError {}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Expand bounds to include a point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Get center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extent along each axis
    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Owned mesh: positions (w = 1), normals (w = 0), faces
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    vertices: Vec<Vec4>,
    normals: Vec<Vec4>,
    faces: Vec<Face>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Vec4>, normals: Vec<Vec4>, faces: Vec<Face>) -> Result<Self, MeshError> {
        if vertices.len() != normals.len() {
            return Err(MeshError::NormalCountMismatch {
                vertices: vertices.len(),
                normals: normals.len(),
            });
        }
        check_indices(&faces, vertices.len())?;
        Ok(Self { vertices, normals, faces })
    }

    /// Bounds of the vertex positions; `None` for an empty mesh
    pub fn bounds(&self) -> Option<Aabb> {
        let first = self.vertices.first()?.truncate();
        let mut aabb = Aabb::new(first, first);
        for v in &self.vertices[1..] {
            aabb.expand(v.truncate());
        }
        Some(aabb)
    }
}

impl NormalMesh for TriangleMesh {
    fn vertices(&self) -> &[Vec4] {
        &self.vertices
    }

    fn normals(&self) -> &[Vec4] {
        &self.normals
    }

    fn faces(&self) -> &[Face] {
        &self.faces
    }
}

fn check_indices(faces: &[Face], vertex_count: usize) -> Result<(), MeshError> {
    for (face_idx, face) in faces.iter().enumerate() {
        if let Some(&index) = face.indices().iter().find(|&&i| i >= vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                face: face_idx,
                index,
                vertex_count,
            });
        }
    }
    Ok(())
}

/// Split shared vertices so every face gets its own three, each carrying the
/// face normal. Degenerate faces get a zero normal.
pub fn flat_shaded(positions: &[Vec4], faces: &[Face]) -> Result<TriangleMesh, MeshError> {
    check_indices(faces, positions.len())?;
    Ok(build_flat(positions, faces))
}

fn build_flat(positions: &[Vec4], faces: &[Face]) -> TriangleMesh {
    let mut vertices = Vec::with_capacity(faces.len() * 3);
    let mut normals = Vec::with_capacity(faces.len() * 3);
    let mut flat_faces = Vec::with_capacity(faces.len());

    for face in faces {
        let [p, q, r] = face.indices().map(|i| positions[i]);
        let normal = (q - p).truncate().cross((r - p).truncate()).normalize_or_zero();

        let base = vertices.len();
        vertices.extend([p, q, r]);
        normals.extend([normal.extend(0.0); 3]);
        flat_faces.push(Face::new(base, base + 1, base + 2));
    }

    TriangleMesh {
        vertices,
        normals,
        faces: flat_faces,
    }
}

/// Flat-shaded cube spanning [-1, 1] on every axis, faces wound outward
pub fn cube() -> TriangleMesh {
    let corners = [
        // Top 4
        Vec4::new(1.0, 1.0, -1.0, 1.0),
        Vec4::new(-1.0, 1.0, -1.0, 1.0),
        Vec4::new(-1.0, 1.0, 1.0, 1.0),
        Vec4::new(1.0, 1.0, 1.0, 1.0),
        // Bottom 4
        Vec4::new(1.0, -1.0, -1.0, 1.0),
        Vec4::new(-1.0, -1.0, -1.0, 1.0),
        Vec4::new(-1.0, -1.0, 1.0, 1.0),
        Vec4::new(1.0, -1.0, 1.0, 1.0),
    ];
    let faces = [
        [0, 1, 2], [2, 3, 0], // top
        [3, 2, 6], [6, 7, 3], // front
        [2, 1, 5], [5, 6, 2], // left
        [4, 0, 3], [3, 7, 4], // right
        [5, 1, 0], [0, 4, 5], // back
        [5, 4, 7], [7, 6, 5], // bottom
    ]
    .map(|[a, b, c]| Face::new(a, b, c));

    build_flat(&corners, &faces)
}

/// Unit sphere with smooth normals: `segments` latitude bands and twice as
/// many longitude slices.
pub fn sphere(segments: usize) -> Result<TriangleMesh, MeshError> {
    if segments < 3 {
        return Err(MeshError::TooFewSegments(segments));
    }
    let rings = segments;
    let slices = 2 * segments;

    let mut vertices = Vec::with_capacity((rings + 1) * (slices + 1));
    for i in 0..=rings {
        let theta = PI * i as f32 / rings as f32;
        for j in 0..=slices {
            let phi = 2.0 * PI * j as f32 / slices as f32;
            let dir = Vec3::new(theta.sin() * phi.sin(), theta.cos(), theta.sin() * phi.cos());
            vertices.push(dir.extend(1.0));
        }
    }
    let normals = vertices.iter().map(|v| v.truncate().extend(0.0)).collect();

    let index = |i: usize, j: usize| i * (slices + 1) + j;
    let mut faces = Vec::with_capacity(2 * rings * slices);
    for i in 0..rings {
        for j in 0..slices {
            let (a, b, c, d) = (index(i, j), index(i + 1, j), index(i + 1, j + 1), index(i, j + 1));
            // The pole rows collapse one triangle of each quad
            if i + 1 < rings {
                faces.push(Face::new(a, b, c));
            }
            if i > 0 {
                faces.push(Face::new(a, c, d));
            }
        }
    }

    TriangleMesh::new(vertices, normals, faces)
}
