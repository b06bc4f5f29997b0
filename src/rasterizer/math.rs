//! Affine helpers and barycentric math for 3D rendering
//!
//! Points and vectors are homogeneous `Vec4`s (w = 1 for points, w = 0 for
//! vectors). Angles are in degrees.

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

/// Triangles whose edge matrix determinant is below this (in pixels²) are skipped
pub const DEGENERATE_AREA: f32 = 1e-6;

/// Homogeneous point (w = 1)
pub fn point(x: f32, y: f32, z: f32) -> Vec4 {
    Vec4::new(x, y, z, 1.0)
}

/// Homogeneous vector (w = 0)
pub fn vector(x: f32, y: f32, z: f32) -> Vec4 {
    Vec4::new(x, y, z, 0.0)
}

/// Affine matrix with linear part columns `lx, ly, lz` and translation `p`
pub fn affine(lx: Vec3, ly: Vec3, lz: Vec3, p: Vec3) -> Mat4 {
    Mat4::from_cols(lx.extend(0.0), ly.extend(0.0), lz.extend(0.0), p.extend(1.0))
}

/// Inverse of an affine matrix (linear part inverted, translation undone)
pub fn affine_inverse(m: Mat4) -> Mat4 {
    let linear_inv = Mat3::from_mat4(m).inverse();
    let t = -(linear_inv * m.w_axis.truncate());
    Mat4::from_cols(
        linear_inv.x_axis.extend(0.0),
        linear_inv.y_axis.extend(0.0),
        linear_inv.z_axis.extend(0.0),
        t.extend(1.0),
    )
}

/// Rotation by `degrees` about `axis` (axis need not be unit length)
pub fn rotate(degrees: f32, axis: Vec3) -> Mat4 {
    Mat4::from_axis_angle(axis.normalize(), degrees.to_radians())
}

/// Non-uniform scale
pub fn scale(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_scale(Vec3::new(x, y, z))
}

/// Translation by `v`
pub fn translate(v: Vec3) -> Mat4 {
    Mat4::from_translation(v)
}

/// Inverse-transpose of the model's linear part, used to carry normals to world space.
/// Returns non-finite entries when the linear part is singular.
pub fn normal_matrix(model: Mat4) -> Mat3 {
    Mat3::from_mat4(model).inverse().transpose()
}

/// True when the linear part of `model` has no finite inverse
pub fn is_singular(model: Mat4) -> bool {
    !normal_matrix(model).is_finite()
}

/// Per-triangle edge matrix `[Q-P | R-P]` and its inverse.
///
/// The inverse is stored as adjugate and determinant so the inside test can
/// work on the adjugate products directly: for integer pixel centers and
/// integer vertex positions those are exact, and a pixel sitting on an edge
/// gets a weight of exactly zero instead of a rounding-dependent sliver.
#[derive(Debug, Clone, Copy)]
pub struct EdgeMatrix {
    origin: Vec2,
    adjugate: Mat2,
    det: f32,
}

impl EdgeMatrix {
    /// Build the matrix for triangle (p, q, r); `None` when it has no area
    pub fn new(p: Vec2, q: Vec2, r: Vec2) -> Option<Self> {
        let e1 = q - p;
        let e2 = r - p;
        let det = e1.x * e2.y - e2.x * e1.y;
        if !det.is_finite() || det.abs() < DEGENERATE_AREA {
            return None;
        }
        // adj([e1 | e2]) = [[e2.y, -e2.x], [-e1.y, e1.x]]
        let adjugate = Mat2::from_cols(Vec2::new(e2.y, -e1.y), Vec2::new(-e2.x, e1.x));
        Some(Self { origin: p, adjugate, det })
    }

    /// Signed doubled area; positive for counter-clockwise (P, Q, R) in a y-up frame
    pub fn det(&self) -> f32 {
        self.det
    }

    /// Inverse of the edge matrix
    pub fn inverse(&self) -> Mat2 {
        self.adjugate * (1.0 / self.det)
    }

    /// Barycentric numerators `(l, u, v) * |det|`, sign-corrected so that
    /// points inside the triangle have all three components >= 0 whatever
    /// the winding.
    pub fn numerators(&self, pixel: Vec2) -> Vec3 {
        let n = self.adjugate * (pixel - self.origin);
        let sign = self.det.signum();
        let nu = n.x * sign;
        let nv = n.y * sign;
        Vec3::new(self.det.abs() - nu - nv, nu, nv)
    }

    /// Normalize numerators into weights `(l, u, v)` summing to 1
    pub fn weights(&self, numerators: Vec3) -> Vec3 {
        numerators / self.det.abs()
    }
}

/// Barycentric coordinates `(l, u, v)` of `p` relative to triangle (a, b, c),
/// weighting a, b and c respectively. `None` for degenerate triangles.
pub fn barycentric(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> Option<Vec3> {
    let m = EdgeMatrix::new(a, b, c)?;
    Some(m.weights(m.numerators(p)))
}

/// Reweight device-space barycentrics by each vertex's clip w and renormalize,
/// giving weights that interpolate world-space attributes correctly.
pub fn perspective_weights(weights: Vec3, clip_w: Vec3) -> Vec3 {
    let corrected = weights / clip_w;
    let sum = corrected.x + corrected.y + corrected.z;
    if sum == 0.0 || !sum.is_finite() {
        return weights;
    }
    corrected / sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_inverse_roundtrip() {
        let m = translate(Vec3::new(1.0, -2.0, 3.0)) * rotate(30.0, Vec3::new(1.0, 1.0, 0.0)) * scale(2.0, 1.0, 0.5);
        let p = point(0.3, 0.7, -1.1);
        let back = affine_inverse(m) * (m * p);
        assert!((back - p).length() < 0.0001);
    }

    #[test]
    fn test_affine_columns() {
        let m = affine(Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(4.0, 5.0, 6.0));
        let p = m * point(1.0, 0.0, 0.0);
        assert!((p - point(5.0, 5.0, 6.0)).length() < 0.0001);
        // Vectors ignore the translation
        let v = m * vector(1.0, 0.0, 0.0);
        assert!((v - vector(1.0, 0.0, 0.0)).length() < 0.0001);
    }

    #[test]
    fn test_normal_matrix_non_uniform_scale() {
        // A 45-degree surface squashed in y: the normal must stay perpendicular
        let model = scale(1.0, 0.25, 1.0);
        let tangent = (model * vector(1.0, -1.0, 0.0)).truncate();
        let normal = normal_matrix(model) * Vec3::new(1.0, 1.0, 0.0);
        assert!(tangent.dot(normal).abs() < 0.0001);
    }

    #[test]
    fn test_singular_model() {
        assert!(is_singular(scale(1.0, 0.0, 1.0)));
        assert!(!is_singular(rotate(10.0, Vec3::Z)));
        // Tiny but invertible
        assert!(!is_singular(scale(0.001, 0.001, 0.001)));
        assert!(!is_singular(translate(Vec3::ONE) * scale(1e-4, 2.0, 3.0)));
    }

    #[test]
    fn test_barycentric_weight_order() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        let c = Vec2::new(0.0, 10.0);
        let at_b = barycentric(b, a, b, c).unwrap();
        assert!((at_b - Vec3::new(0.0, 1.0, 0.0)).length() < 0.0001);
        let at_c = barycentric(c, a, b, c).unwrap();
        assert!((at_c - Vec3::new(0.0, 0.0, 1.0)).length() < 0.0001);
        let inside = barycentric(Vec2::new(2.0, 3.0), a, b, c).unwrap();
        assert!((inside - Vec3::new(0.5, 0.2, 0.3)).length() < 0.0001);
    }

    #[test]
    fn test_edge_pixels_are_exactly_zero() {
        let m = EdgeMatrix::new(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)).unwrap();
        for i in 0..=10 {
            let n = m.numerators(Vec2::new(i as f32, (10 - i) as f32));
            assert_eq!(n.x, 0.0);
        }
    }

    #[test]
    fn test_clockwise_winding_same_weights() {
        let p = Vec2::new(1.0, 1.0);
        let ccw = barycentric(p, Vec2::ZERO, Vec2::new(4.0, 0.0), Vec2::new(0.0, 4.0)).unwrap();
        let cw = barycentric(p, Vec2::ZERO, Vec2::new(0.0, 4.0), Vec2::new(4.0, 0.0)).unwrap();
        assert!((ccw.x - cw.x).abs() < 0.0001);
        assert!((ccw.y - cw.z).abs() < 0.0001);
        assert!((ccw.z - cw.y).abs() < 0.0001);
    }

    #[test]
    fn test_inverse_matches_adjugate() {
        let m = EdgeMatrix::new(Vec2::new(1.0, 2.0), Vec2::new(7.0, 3.0), Vec2::new(2.0, 9.0)).unwrap();
        let e = Mat2::from_cols(Vec2::new(6.0, 1.0), Vec2::new(1.0, 7.0));
        let id = m.inverse() * e;
        assert!((id.x_axis - Vec2::X).length() < 0.0001);
        assert!((id.y_axis - Vec2::Y).length() < 0.0001);
    }

    #[test]
    fn test_degenerate_triangle() {
        assert!(EdgeMatrix::new(Vec2::ZERO, Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)).is_none());
    }

    #[test]
    fn test_perspective_weights_equal_w_is_identity() {
        let w = Vec3::new(0.2, 0.3, 0.5);
        let pw = perspective_weights(w, Vec3::splat(4.0));
        assert!((pw - w).length() < 0.0001);
    }
}
