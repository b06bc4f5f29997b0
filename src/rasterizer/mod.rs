//! Software triangle rasterizer
//!
//! Features:
//! - Bounding-box barycentric rasterization with a selectable edge rule
//! - Z-buffer (NDC depth, cleared to 1.0, smaller is closer)
//! - Perspective-correct normal interpolation
//! - Lambertian diffuse shading
//! - Pluggable raster targets (origin, stride, RGB/RGBA)

mod camera;
mod math;
mod raster;
mod render;
mod types;

pub use camera::*;
pub use math::*;
pub use raster::*;
pub use render::*;
pub use types::*;

/// Default viewer resolution
pub const WIDTH: usize = 320;
pub const HEIGHT: usize = 240;
