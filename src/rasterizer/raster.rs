//! Raster targets: cursor-based access to a color buffer and a depth buffer
//!
//! The renderer only ever talks to a `RasterTarget`: it moves a cursor,
//! reads and writes depth there, writes a color and steps right. Memory
//! layout (origin, stride, channel count) is the target's business.

use std::path::Path;

use super::types::Color;

/// Depth value meaning "nothing drawn yet"
pub const FAR_DEPTH: f32 = 1.0;

/// Pixel sink used by the renderer.
///
/// Coordinates are device pixels with y growing upwards; `goto` is only
/// called with `x < width()` and `y < height()`.
pub trait RasterTarget {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Move the cursor to pixel (x, y)
    fn goto(&mut self, x: usize, y: usize);
    /// Depth stored under the cursor
    fn depth(&self) -> f32;
    fn write_depth(&mut self, z: f32);
    fn write_color(&mut self, color: Color);
    /// Step the cursor one pixel to the right
    fn increment_x(&mut self);
}

/// Where device pixel (0, 0) appears in the stored image.
///
/// Buffers are stored top row first (the layout `image` and GPU textures
/// expect), so `BottomLeft` flips rows when the cursor moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    BottomLeft,
    TopLeft,
}

/// Shape of the caller's buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLayout {
    pub width: usize,
    pub height: usize,
    /// Bytes between the starts of consecutive color rows
    pub stride: usize,
    /// 3 (RGB) or 4 (RGBA)
    pub channels: usize,
    pub origin: Origin,
}

impl RasterLayout {
    /// Tightly packed rows
    pub fn packed(width: usize, height: usize, channels: usize, origin: Origin) -> Self {
        Self {
            width,
            height,
            stride: width * channels,
            channels,
            origin,
        }
    }
}

/// Error type for raster construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    UnsupportedChannels(usize),
    StrideTooSmall { stride: usize, needed: usize },
    ColorBufferTooSmall { len: usize, needed: usize },
    DepthBufferTooSmall { len: usize, needed: usize },
}

impl std::fmt::Display for RasterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterError::UnsupportedChannels(c) => write!(f, "Unsupported channel count: {}", c),
            RasterError::StrideTooSmall { stride, needed } => {
                write!(f, "Row stride {} is smaller than a row ({} bytes)", stride, needed)
            }
            RasterError::ColorBufferTooSmall { len, needed } => {
                write!(f, "Color buffer has {} bytes, needs {}", len, needed)
            }
            RasterError::DepthBufferTooSmall { len, needed } => {
                write!(f, "Depth buffer has {} entries, needs {}", len, needed)
            }
        }
    }
}

impl std::error::Error for RasterError {}

/// A `RasterTarget` over caller-owned color and depth slices.
///
/// Depth is one `f32` per pixel, packed rows, same row order as color.
pub struct Raster<'a> {
    color: &'a mut [u8],
    depth: &'a mut [f32],
    layout: RasterLayout,
    color_offset: usize,
    depth_offset: usize,
}

impl<'a> Raster<'a> {
    pub fn new(color: &'a mut [u8], depth: &'a mut [f32], layout: RasterLayout) -> Result<Self, RasterError> {
        if layout.channels != 3 && layout.channels != 4 {
            return Err(RasterError::UnsupportedChannels(layout.channels));
        }
        let row_bytes = layout.width * layout.channels;
        if layout.stride < row_bytes {
            return Err(RasterError::StrideTooSmall { stride: layout.stride, needed: row_bytes });
        }
        let needed = if layout.height == 0 {
            0
        } else {
            layout.stride * (layout.height - 1) + row_bytes
        };
        if color.len() < needed {
            return Err(RasterError::ColorBufferTooSmall { len: color.len(), needed });
        }
        let needed = layout.width * layout.height;
        if depth.len() < needed {
            return Err(RasterError::DepthBufferTooSmall { len: depth.len(), needed });
        }

        Ok(Self {
            color,
            depth,
            layout,
            color_offset: 0,
            depth_offset: 0,
        })
    }

    pub fn layout(&self) -> RasterLayout {
        self.layout
    }

    fn row(&self, y: usize) -> usize {
        match self.layout.origin {
            Origin::TopLeft => y,
            Origin::BottomLeft => self.layout.height - 1 - y,
        }
    }
}

impl RasterTarget for Raster<'_> {
    fn width(&self) -> usize {
        self.layout.width
    }

    fn height(&self) -> usize {
        self.layout.height
    }

    fn goto(&mut self, x: usize, y: usize) {
        debug_assert!(x < self.layout.width && y < self.layout.height);
        let row = self.row(y);
        self.color_offset = row * self.layout.stride + x * self.layout.channels;
        self.depth_offset = row * self.layout.width + x;
    }

    fn depth(&self) -> f32 {
        self.depth[self.depth_offset]
    }

    fn write_depth(&mut self, z: f32) {
        self.depth[self.depth_offset] = z;
    }

    fn write_color(&mut self, color: Color) {
        let bytes = color.to_bytes();
        let n = self.layout.channels;
        self.color[self.color_offset..self.color_offset + n].copy_from_slice(&bytes[..n]);
    }

    fn increment_x(&mut self) {
        self.color_offset += self.layout.channels;
        self.depth_offset += 1;
    }
}

/// Error type for framebuffer snapshots
#[derive(Debug)]
pub enum SnapshotError {
    ImageError(image::ImageError),
    SizeError { width: usize, height: usize },
}

impl From<image::ImageError> for SnapshotError {
    fn from(e: image::ImageError) -> Self {
        SnapshotError::ImageError(e)
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::ImageError(e) => write!(f, "Image error: {}", e),
            SnapshotError::SizeError { width, height } => {
                write!(f, "Size error: {}x{} does not fit an image", width, height)
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Owned RGBA framebuffer with depth, stored top row first
pub struct Framebuffer {
    pub pixels: Vec<u8>,   // RGBA, 4 bytes per pixel
    pub zbuffer: Vec<f32>, // Depth buffer
    pub width: usize,
    pub height: usize,
    pub origin: Origin,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            zbuffer: vec![FAR_DEPTH; width * height],
            width,
            height,
            origin: Origin::BottomLeft,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Borrow the buffers as a raster target
    pub fn raster(&mut self) -> Raster<'_> {
        let layout = RasterLayout::packed(self.width, self.height, 4, self.origin);
        Raster {
            color: &mut self.pixels,
            depth: &mut self.zbuffer,
            layout,
            color_offset: 0,
            depth_offset: 0,
        }
    }

    /// Color at device pixel (x, y)
    pub fn color_at(&self, x: usize, y: usize) -> Color {
        let idx = self.index(x, y) * 4;
        Color::new(self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2])
    }

    /// Depth at device pixel (x, y)
    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        self.zbuffer[self.index(x, y)]
    }

    fn index(&self, x: usize, y: usize) -> usize {
        let row = match self.origin {
            Origin::TopLeft => y,
            Origin::BottomLeft => self.height - 1 - y,
        };
        row * self.width + x
    }

    /// Write the color buffer to a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        let size_error = SnapshotError::SizeError { width: self.width, height: self.height };
        let (Ok(w), Ok(h)) = (u32::try_from(self.width), u32::try_from(self.height)) else {
            return Err(size_error);
        };
        let img = image::RgbaImage::from_raw(w, h, self.pixels.clone()).ok_or(size_error)?;
        img.save(path.as_ref())?;
        log::info!("Saved snapshot: {} ({}x{})", path.as_ref().display(), self.width, self.height);
        Ok(())
    }
}
