//! World module - what gets drawn
//!
//! - Triangle meshes with per-vertex normals, plus cube/sphere builders
//! - RON scene files: camera, light, and a list of shaded objects

mod mesh;
mod scene;

pub use mesh::*;
pub use scene::*;
