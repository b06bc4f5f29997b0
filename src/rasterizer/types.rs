//! Core types for the rasterizer

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// A triangle face (indices into the vertex array)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub v0: usize,
    pub v1: usize,
    pub v2: usize,
}

impl Face {
    pub fn new(v0: usize, v1: usize, v2: usize) -> Self {
        Self { v0, v1, v2 }
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.v0, self.v1, self.v2]
    }
}

/// Anything the renderer can draw: homogeneous positions, one normal per
/// position, and triangles indexing into them.
///
/// Implementors guarantee `normals().len() == vertices().len()` and that
/// every face index is below `vertices().len()`.
pub trait NormalMesh {
    fn vertices(&self) -> &[Vec4];
    fn normals(&self) -> &[Vec4];
    fn faces(&self) -> &[Face];
}

/// RGB color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale a unit-range color to 0-255, clamping each channel
    pub fn from_unit(c: Vec3) -> Self {
        let to_byte = |v: f32| (v * 255.0).clamp(0.0, 255.0) as u8;
        Self {
            r: to_byte(c.x),
            g: to_byte(c.y),
            b: to_byte(c.z),
        }
    }

    /// Convert to [u8; 4] for RGBA buffers (alpha is always opaque)
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

/// Light and material state consumed by the diffuse shader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    /// Unit direction towards the light
    pub light_direction: Vec3,
    pub light_color: Vec3,
    pub ambient: Vec3,
    /// Per-channel diffuse reflection coefficient (Kd)
    pub diffuse: Vec3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            light_direction: Vec3::Z,
            light_color: Vec3::ONE,
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
        }
    }
}

/// Which triangle owns pixels lying exactly on an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeRule {
    /// Closed triangles: every edge pixel is inside. Pixels on an edge
    /// shared by two triangles are covered twice; the strict depth test
    /// keeps the first write when both are coplanar.
    #[default]
    Inclusive,
    /// Each pixel on a shared edge is drawn exactly once. Named for the
    /// y-down view of a target with `Origin::TopLeft`, where device row 0 is
    /// the top row: there the left and top edges own their pixels. In y-up
    /// device coordinates those are the left and bottom edges.
    TopLeft,
}

/// Rasterizer settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Skip triangles wound clockwise on screen
    pub backface_cull: bool,
    /// Tie-break for pixels on triangle edges
    pub edge_rule: EdgeRule,
}

/// Counters for one `draw` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Faces submitted
    pub triangles: usize,
    /// Faces dropped because a vertex had clip w <= 0
    pub behind_camera: usize,
    /// Faces dropped by backface culling
    pub culled: usize,
    /// Faces with (near) zero screen area
    pub degenerate: usize,
    /// Pixels that passed the depth test and were shaded
    pub pixels_written: usize,
}

impl std::ops::AddAssign for DrawStats {
    fn add_assign(&mut self, other: DrawStats) {
        self.triangles += other.triangles;
        self.behind_camera += other.behind_camera;
        self.culled += other.culled;
        self.degenerate += other.degenerate;
        self.pixels_written += other.pixels_written;
    }
}
