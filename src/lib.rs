//! Soft Render: CPU triangle rasterizer with diffuse shading
//!
//! Draws triangle meshes into caller-owned color and depth buffers without
//! any GPU involvement:
//! - Vertex transform through model, view and perspective matrices
//! - Rejection of triangles reaching behind the camera
//! - Bounding-box barycentric rasterization with a z-buffer
//! - Perspective-correct normals and Lambertian shading

pub mod rasterizer;
pub mod world;
