//! Camera model: eye point, orthonormal right/up/back frame, and a
//! symmetric viewing frustum.
//!
//! The camera looks down `-back`. Moves are pure: every operation returns a
//! new camera whose frame has been re-orthonormalized, so repeated small
//! rotations don't drift.

use glam::{Mat4, Vec3, Vec4};

use super::math::{affine, affine_inverse, rotate};

/// Viewport extents on the projection plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Distance from the eye to the projection plane
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    eye: Vec3,
    right: Vec3,
    up: Vec3,
    back: Vec3,
    near: f32,
    far: f32,
    viewport: Viewport,
}

impl Camera {
    /// Camera at `eye` looking along `look`, with `relative_up` picking the roll.
    /// `fov` is the horizontal field of view in degrees; the projection plane
    /// sits at the near distance.
    pub fn new(eye: Vec3, look: Vec3, relative_up: Vec3, fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let back = -look.normalize();
        let right = look.cross(relative_up).normalize();
        let up = back.cross(right);
        let width = 2.0 * near * (fov.to_radians() / 2.0).tan();
        Self {
            eye,
            right,
            up,
            back,
            near,
            far,
            viewport: Viewport {
                width,
                height: width / aspect,
                distance: near,
            },
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn back(&self) -> Vec3 {
        self.back
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Scale the viewport extents (factor < 1 zooms in)
    pub fn zoom(self, factor: f32) -> Self {
        Self {
            viewport: Viewport {
                width: self.viewport.width * factor,
                height: self.viewport.height * factor,
                ..self.viewport
            },
            ..self
        }
    }

    /// Move the eye along the viewing direction
    pub fn forward(self, distance: f32) -> Self {
        Self {
            eye: self.eye - distance * self.back,
            ..self
        }
    }

    /// Rotate about the up vector
    pub fn yaw(self, degrees: f32) -> Self {
        let r = rotate(degrees, self.up);
        Self {
            right: r.transform_vector3(self.right),
            back: r.transform_vector3(self.back),
            ..self
        }
        .orthonormalized()
    }

    /// Rotate about the right vector
    pub fn pitch(self, degrees: f32) -> Self {
        let r = rotate(degrees, self.right);
        Self {
            up: r.transform_vector3(self.up),
            back: r.transform_vector3(self.back),
            ..self
        }
        .orthonormalized()
    }

    /// Rotate about the back vector
    pub fn roll(self, degrees: f32) -> Self {
        let r = rotate(degrees, self.back);
        Self {
            right: r.transform_vector3(self.right),
            up: r.transform_vector3(self.up),
            ..self
        }
        .orthonormalized()
    }

    /// Gram-Schmidt on (back, up), then rebuild right
    fn orthonormalized(self) -> Self {
        let back = self.back.normalize();
        let up = (self.up - self.up.dot(back) * back).normalize();
        let right = up.cross(back);
        Self { right, up, back, ..self }
    }

    /// Camera space to world space
    pub fn camera_to_world(&self) -> Mat4 {
        affine(self.right, self.up, self.back, self.eye)
    }

    /// World space to camera space
    pub fn view_matrix(&self) -> Mat4 {
        affine_inverse(self.camera_to_world())
    }

    /// Camera space to clip space; the frustum maps to the [-1, 1] cube after
    /// the perspective divide, with the near plane at z = -1.
    pub fn perspective_matrix(&self) -> Mat4 {
        let Viewport { width, height, distance } = self.viewport;
        let (n, f) = (self.near, self.far);
        Mat4::from_cols(
            Vec4::new(2.0 * distance / width, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 * distance / height, 0.0, 0.0),
            Vec4::new(0.0, 0.0, (n + f) / (n - f), -1.0),
            Vec4::new(0.0, 0.0, 2.0 * n * f / (n - f), 0.0),
        )
    }
}

impl Default for Camera {
    /// Eye at the origin looking down -z, 90 degree field of view, square aspect
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 90.0, 1.0, 0.1, 10.0)
    }
}
