//! Diffuse software renderer
//!
//! One `draw` runs the whole pipeline for a mesh:
//! 1. transform every vertex once (clip position, world normal)
//! 2. drop triangles with a vertex at or behind the camera plane (w <= 0)
//! 3. perspective divide and map to device pixels (y up)
//! 4. walk the pixel bounding box, classifying pixels with barycentrics
//! 5. depth test, perspective-correct normal, diffuse shading, write
//!
//! There is no clipping against the frustum sides: a triangle crossing the
//! camera plane disappears entirely, anything else off-screen is handled by
//! clamping the bounding box.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use super::camera::Camera;
use super::math::{is_singular, normal_matrix, perspective_weights, EdgeMatrix};
use super::raster::{RasterTarget, FAR_DEPTH};
use super::types::{Color, DrawStats, EdgeRule, Lighting, NormalMesh, RasterSettings};

/// Per-vertex working record, rebuilt for every draw call
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vec4,
    /// Pixel x, pixel y, NDC z
    device: Vec3,
    /// World space, not normalized
    normal: Vec3,
}

/// Renderer state: transforms plus light and material, set between draws
#[derive(Debug, Clone)]
pub struct DiffuseRenderer {
    settings: RasterSettings,
    model: Mat4,
    normal_matrix: Mat3,
    view: Mat4,
    projection: Mat4,
    lighting: Lighting,
}

impl DiffuseRenderer {
    pub fn new(settings: RasterSettings) -> Self {
        Self {
            settings,
            model: Mat4::IDENTITY,
            normal_matrix: Mat3::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            lighting: Lighting::default(),
        }
    }

    pub fn settings(&self) -> RasterSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: RasterSettings) {
        self.settings = settings;
    }

    pub fn set_backface_cull(&mut self, yes: bool) {
        self.settings.backface_cull = yes;
    }

    pub fn set_edge_rule(&mut self, rule: EdgeRule) {
        self.settings.edge_rule = rule;
    }

    /// Object to world transform. A singular linear part leaves the normals
    /// undefined; such pixels shade with ambient light only.
    pub fn set_model(&mut self, model: Mat4) {
        if is_singular(model) {
            log::warn!("Model matrix is not invertible, normals will be undefined");
        }
        self.model = model;
        self.normal_matrix = normal_matrix(model);
    }

    pub fn set_camera(&mut self, camera: &Camera) {
        self.view = camera.view_matrix();
        self.projection = camera.perspective_matrix();
    }

    /// Use explicit world-to-camera and camera-to-clip matrices
    pub fn set_view_projection(&mut self, view: Mat4, projection: Mat4) {
        self.view = view;
        self.projection = projection;
    }

    pub fn set_diffuse_coefficient(&mut self, k: Vec3) {
        self.lighting.diffuse = k;
    }

    /// `direction` points towards the light and is normalized here
    pub fn set_light(&mut self, direction: Vec3, color: Vec3) {
        self.lighting.light_direction = direction.normalize_or_zero();
        self.lighting.light_color = color;
    }

    pub fn set_ambient(&mut self, color: Vec3) {
        self.lighting.ambient = color;
    }

    pub fn lighting(&self) -> Lighting {
        self.lighting
    }

    /// Fill every pixel with `color` (unit range) and reset depth to the far value
    pub fn clear<T: RasterTarget + ?Sized>(&self, target: &mut T, color: Vec3) {
        let c = Color::from_unit(color);
        for j in 0..target.height() {
            if target.width() == 0 {
                break;
            }
            target.goto(0, j);
            for _ in 0..target.width() {
                target.write_color(c);
                target.write_depth(FAR_DEPTH);
                target.increment_x();
            }
        }
    }

    /// Rasterize every face of `mesh` into `target`
    pub fn draw<T, M>(&self, target: &mut T, mesh: &M) -> DrawStats
    where
        T: RasterTarget + ?Sized,
        M: NormalMesh + ?Sized,
    {
        let mut stats = DrawStats::default();
        let verts = self.transform_vertices(mesh, target.width(), target.height());

        for face in mesh.faces() {
            stats.triangles += 1;
            let [i0, i1, i2] = face.indices();
            let tri = [verts[i0], verts[i1], verts[i2]];

            if behind_camera(&tri) {
                stats.behind_camera += 1;
                continue;
            }
            rasterize_triangle(target, &tri, &self.settings, &self.lighting, &mut stats);
        }

        log::debug!(
            "draw: {} triangles, {} behind camera, {} culled, {} degenerate, {} pixels",
            stats.triangles,
            stats.behind_camera,
            stats.culled,
            stats.degenerate,
            stats.pixels_written,
        );
        stats
    }

    /// Transform stage, once per vertex
    fn transform_vertices<M: NormalMesh + ?Sized>(&self, mesh: &M, width: usize, height: usize) -> Vec<ClipVertex> {
        let clip_matrix = self.projection * self.view * self.model;
        mesh.vertices()
            .iter()
            .zip(mesh.normals())
            .map(|(&pos, &normal)| {
                let clip = clip_matrix * pos;
                let device = if clip.w > 0.0 {
                    project_to_device(clip, width, height)
                } else {
                    Vec3::NAN
                };
                ClipVertex {
                    clip,
                    device,
                    normal: self.normal_matrix * normal.truncate(),
                }
            })
            .collect()
    }
}

impl Default for DiffuseRenderer {
    fn default() -> Self {
        Self::new(RasterSettings::default())
    }
}

/// Perspective divide, then NDC x,y to pixels (y up). z stays in NDC.
pub fn project_to_device(clip: Vec4, width: usize, height: usize) -> Vec3 {
    let ndc = clip.truncate() / clip.w;
    Vec3::new(
        width as f32 * (ndc.x + 1.0) / 2.0,
        height as f32 * (ndc.y + 1.0) / 2.0,
        ndc.z,
    )
}

/// Lambertian shading: ambient + max(0, L.N) * Kd * Lc, scaled to bytes
pub fn shade_diffuse(lighting: &Lighting, normal: Vec3) -> Color {
    let lambert = lighting.light_direction.dot(normal).max(0.0);
    Color::from_unit(lighting.ambient + lambert * lighting.diffuse * lighting.light_color)
}

fn behind_camera(tri: &[ClipVertex; 3]) -> bool {
    tri.iter().any(|v| v.clip.w <= 0.0)
}

/// Whether pixels exactly on the directed edge `from -> to` belong to this
/// triangle under the top-left rule. Left and bottom edges own their pixels
/// (interior is on the left of a counter-clockwise edge in a y-up frame).
fn owns_edge(from: Vec2, to: Vec2, counter_clockwise: bool) -> bool {
    let e = if counter_clockwise { to - from } else { from - to };
    e.y < 0.0 || (e.y == 0.0 && e.x > 0.0)
}

fn covers(numerators: Vec3, rule: EdgeRule, owned: [bool; 3]) -> bool {
    match rule {
        EdgeRule::Inclusive => numerators.cmpge(Vec3::ZERO).all(),
        EdgeRule::TopLeft => numerators
            .to_array()
            .iter()
            .zip(owned)
            .all(|(&n, own)| n > 0.0 || (n == 0.0 && own)),
    }
}

fn rasterize_triangle<T: RasterTarget + ?Sized>(
    target: &mut T,
    tri: &[ClipVertex; 3],
    settings: &RasterSettings,
    lighting: &Lighting,
    stats: &mut DrawStats,
) {
    let [a, b, c] = tri;
    let (p, q, r) = (a.device.truncate(), b.device.truncate(), c.device.truncate());

    let Some(edges) = EdgeMatrix::new(p, q, r) else {
        stats.degenerate += 1;
        return;
    };
    let ccw = edges.det() > 0.0;
    if settings.backface_cull && !ccw {
        stats.culled += 1;
        return;
    }

    // Bounding box on integer pixels, clamped to the target
    let min = p.min(q).min(r);
    let max = p.max(q).max(r);
    let x0 = (min.x.ceil() as i64).max(0);
    let y0 = (min.y.ceil() as i64).max(0);
    let x1 = (max.x.floor() as i64).min(target.width() as i64 - 1);
    let y1 = (max.y.floor() as i64).min(target.height() as i64 - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }

    // Weight order: l <-> P (edge QR), u <-> Q (edge RP), v <-> R (edge PQ)
    let owned = [owns_edge(q, r, ccw), owns_edge(r, p, ccw), owns_edge(p, q, ccw)];
    let dz = Vec2::new(b.device.z - a.device.z, c.device.z - a.device.z);
    let clip_w = Vec3::new(a.clip.w, b.clip.w, c.clip.w);

    for j in y0..=y1 {
        target.goto(x0 as usize, j as usize);
        for i in x0..=x1 {
            let n = edges.numerators(Vec2::new(i as f32, j as f32));
            if covers(n, settings.edge_rule, owned) {
                let weights = edges.weights(n);
                // l*Pz + u*Qz + v*Rz, exact when all three depths match
                let z = a.device.z + weights.y * dz.x + weights.z * dz.y;
                if z < target.depth() {
                    let pw = perspective_weights(weights, clip_w);
                    let normal = (pw.x * a.normal + pw.y * b.normal + pw.z * c.normal).normalize_or_zero();
                    target.write_color(shade_diffuse(lighting, normal));
                    target.write_depth(z);
                    stats.pixels_written += 1;
                }
            }
            target.increment_x();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::raster::{Framebuffer, Origin};
    use crate::rasterizer::types::Face;

    struct TestMesh {
        vertices: Vec<Vec4>,
        normals: Vec<Vec4>,
        faces: Vec<Face>,
    }

    impl NormalMesh for TestMesh {
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

    /// Mesh whose vertices land on the given device pixels under identity
    /// matrices on a `size` x `size` target
    fn device_mesh(size: usize, points: &[(f32, f32, f32)], faces: &[[usize; 3]]) -> TestMesh {
        let half = size as f32 / 2.0;
        TestMesh {
            vertices: points
                .iter()
                .map(|&(x, y, z)| Vec4::new(x / half - 1.0, y / half - 1.0, z, 1.0))
                .collect(),
            normals: vec![Vec4::new(0.0, 0.0, 1.0, 0.0); points.len()],
            faces: faces.iter().map(|f| Face::new(f[0], f[1], f[2])).collect(),
        }
    }

    /// Counts writes per pixel and never rejects on depth
    struct CoverageTarget {
        width: usize,
        height: usize,
        cursor: usize,
        hits: Vec<u32>,
    }

    impl CoverageTarget {
        fn new(width: usize, height: usize) -> Self {
            Self { width, height, cursor: 0, hits: vec![0; width * height] }
        }
    }

    impl RasterTarget for CoverageTarget {
        fn width(&self) -> usize {
            self.width
        }
        fn height(&self) -> usize {
            self.height
        }
        fn goto(&mut self, x: usize, y: usize) {
            self.cursor = y * self.width + x;
        }
        fn depth(&self) -> f32 {
            f32::INFINITY
        }
        fn write_depth(&mut self, _z: f32) {}
        fn write_color(&mut self, _color: Color) {
            self.hits[self.cursor] += 1;
        }
        fn increment_x(&mut self) {
            self.cursor += 1;
        }
    }

    fn square_mesh() -> TestMesh {
        device_mesh(
            20,
            &[(0.0, 0.0, 0.5), (10.0, 0.0, 0.5), (10.0, 10.0, 0.5), (0.0, 10.0, 0.5)],
            &[[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_shade_diffuse() {
        let lighting = Lighting {
            light_direction: Vec3::Z,
            light_color: Vec3::ONE,
            ambient: Vec3::splat(0.2),
            diffuse: Vec3::new(1.0, 0.5, 0.0),
        };
        assert_eq!(shade_diffuse(&lighting, Vec3::Z), Color::new(255, 178, 51));
        // Facing away: ambient only
        assert_eq!(shade_diffuse(&lighting, Vec3::NEG_Z), Color::new(51, 51, 51));
    }

    #[test]
    fn test_project_to_device() {
        let d = project_to_device(Vec4::new(0.0, -2.0, 1.0, 2.0), 100, 50);
        assert!((d - Vec3::new(50.0, 0.0, 0.5)).length() < 0.0001);
    }

    #[test]
    fn test_top_left_rule_covers_square_once() {
        let mut target = CoverageTarget::new(20, 20);
        let mut renderer = DiffuseRenderer::default();
        renderer.set_edge_rule(EdgeRule::TopLeft);
        renderer.draw(&mut target, &square_mesh());

        for y in 0..20 {
            for x in 0..20 {
                let expected = if x < 10 && y < 10 { 1 } else { 0 };
                assert_eq!(target.hits[y * 20 + x], expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_top_left_rule_owns_displayed_top_and_left() {
        let mut fb = Framebuffer::new(20, 20).with_origin(Origin::TopLeft);
        let mut renderer = DiffuseRenderer::default();
        renderer.set_edge_rule(EdgeRule::TopLeft);
        renderer.clear(&mut fb.raster(), Vec3::ZERO);
        renderer.draw(&mut fb.raster(), &square_mesh());

        // Stored rows run top to bottom: row 0 and column 0 are filled,
        // row 10 and column 10 belong to neighbours
        let lit = |x: usize, row: usize| fb.pixels[(row * 20 + x) * 4] != 0;
        assert!((0..10).all(|x| lit(x, 0)));
        assert!((0..10).all(|row| lit(0, row)));
        assert!((0..=10).all(|x| !lit(x, 10)));
        assert!((0..=10).all(|row| !lit(10, row)));
    }

    #[test]
    fn test_inclusive_rule_shares_diagonal() {
        let mut target = CoverageTarget::new(20, 20);
        let renderer = DiffuseRenderer::default();
        renderer.draw(&mut target, &square_mesh());

        for y in 0..20 {
            for x in 0..20 {
                let expected = if x > 10 || y > 10 {
                    0
                } else if x == y {
                    2
                } else {
                    1
                };
                assert_eq!(target.hits[y * 20 + x], expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_inclusive_shared_edge_written_once_with_depth() {
        let mut fb = Framebuffer::new(20, 20);
        let renderer = DiffuseRenderer::default();
        renderer.clear(&mut fb.raster(), Vec3::ZERO);
        let stats = renderer.draw(&mut fb.raster(), &square_mesh());
        assert_eq!(stats.pixels_written, 121);
    }

    #[test]
    fn test_backface_cull() {
        let cw = device_mesh(20, &[(0.0, 0.0, 0.5), (0.0, 10.0, 0.5), (10.0, 0.0, 0.5)], &[[0, 1, 2]]);
        let mut fb = Framebuffer::new(20, 20);
        let mut renderer = DiffuseRenderer::default();

        let stats = renderer.draw(&mut fb.raster(), &cw);
        assert_eq!(stats.pixels_written, 66);

        renderer.clear(&mut fb.raster(), Vec3::ZERO);
        renderer.set_backface_cull(true);
        let stats = renderer.draw(&mut fb.raster(), &cw);
        assert_eq!(stats.culled, 1);
        assert_eq!(stats.pixels_written, 0);
    }

    #[test]
    fn test_degenerate_triangle_skipped() {
        let mesh = device_mesh(20, &[(1.0, 1.0, 0.5), (5.0, 5.0, 0.5), (9.0, 9.0, 0.5)], &[[0, 1, 2]]);
        let mut fb = Framebuffer::new(20, 20);
        let stats = DiffuseRenderer::default().draw(&mut fb.raster(), &mesh);
        assert_eq!(stats.degenerate, 1);
        assert_eq!(stats.pixels_written, 0);
    }

    #[test]
    fn test_bounding_box_clamped() {
        // Much larger than the target in every direction
        let mesh = device_mesh(20, &[(-50.0, -50.0, 0.5), (90.0, -50.0, 0.5), (-50.0, 90.0, 0.5)], &[[0, 1, 2]]);
        let mut fb = Framebuffer::new(20, 20);
        let stats = DiffuseRenderer::default().draw(&mut fb.raster(), &mesh);
        assert_eq!(stats.pixels_written, 400);
    }

    #[test]
    fn test_triangle_crossing_camera_plane_dropped() {
        let mut mesh = device_mesh(20, &[(0.0, 0.0, 0.5), (10.0, 0.0, 0.5), (0.0, 10.0, 0.5)], &[[0, 1, 2]]);
        mesh.vertices[2].w = -1.0;
        let mut fb = Framebuffer::new(20, 20);
        let stats = DiffuseRenderer::default().draw(&mut fb.raster(), &mesh);
        assert_eq!(stats.behind_camera, 1);
        assert_eq!(stats.pixels_written, 0);
    }

    #[test]
    fn test_singular_model_shades_ambient() {
        let mesh = device_mesh(20, &[(0.0, 0.0, 0.5), (10.0, 0.0, 0.5), (0.0, 10.0, 0.5)], &[[0, 1, 2]]);
        let mut fb = Framebuffer::new(20, 20);
        let mut renderer = DiffuseRenderer::default();
        renderer.set_ambient(Vec3::splat(0.2));
        renderer.set_model(Mat4::from_scale(Vec3::new(1.0, 1.0, 0.0)));
        renderer.clear(&mut fb.raster(), Vec3::ZERO);
        renderer.draw(&mut fb.raster(), &mesh);
        // Flattened in z: depth 0, and the normal is undefined
        assert_eq!(fb.color_at(1, 1), Color::new(51, 51, 51));
    }

    #[test]
    fn test_depth_weights_follow_vertices() {
        let mesh = device_mesh(20, &[(0.0, 0.0, 0.1), (10.0, 0.0, 0.5), (0.0, 10.0, 0.9)], &[[0, 1, 2]]);
        let mut fb = Framebuffer::new(20, 20);
        let renderer = DiffuseRenderer::default();
        renderer.clear(&mut fb.raster(), Vec3::ZERO);
        renderer.draw(&mut fb.raster(), &mesh);

        // u = x / 10, v = y / 10, z = l * 0.1 + u * 0.5 + v * 0.9
        for &(x, y, z) in &[(0, 0, 0.1), (5, 0, 0.3), (2, 3, 0.42), (3, 3, 0.46), (1, 6, 0.62), (0, 10, 0.9)] {
            assert!((fb.depth_at(x, y) - z).abs() < 0.00001, "pixel ({}, {}): {}", x, y, fb.depth_at(x, y));
        }
    }

    #[test]
    fn test_draw_blends_normals_in_world_space() {
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 90.0, 1.0, 0.1, 100.0);
        let world = [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -20.0),
        ];
        let normals = [Vec3::X, Vec3::Y, Vec3::Z];
        let mesh = TestMesh {
            vertices: world.iter().map(|p| p.extend(1.0)).collect(),
            normals: normals.iter().map(|n| n.extend(0.0)).collect(),
            faces: vec![Face::new(0, 1, 2)],
        };

        let mut renderer = DiffuseRenderer::default();
        renderer.set_camera(&camera);
        renderer.set_light(Vec3::X, Vec3::ONE);
        let mut fb = Framebuffer::new(100, 100);
        renderer.clear(&mut fb.raster(), Vec3::ZERO);
        renderer.draw(&mut fb.raster(), &mesh);

        // Pixel nearest the projected centroid
        let clip_matrix = camera.perspective_matrix() * camera.view_matrix();
        let centroid = (world[0] + world[1] + world[2]) / 3.0;
        let px = project_to_device(clip_matrix * centroid.extend(1.0), 100, 100);
        let (i, j) = (px.x.round() as usize, px.y.round() as usize);

        // Intersect that pixel's view ray with the triangle and blend normals
        // by the hit point's world-space barycentrics
        let ray = Vec3::new(i as f32 / 50.0 - 1.0, j as f32 / 50.0 - 1.0, -1.0);
        let plane = (world[1] - world[0]).cross(world[2] - world[0]);
        let hit = ray * (plane.dot(world[0]) / plane.dot(ray));
        let area = |p: Vec3, q: Vec3, r: Vec3| (q - p).cross(r - p).dot(plane);
        let total = area(world[0], world[1], world[2]);
        let w = Vec3::new(
            area(hit, world[1], world[2]),
            area(world[0], hit, world[2]),
            area(world[0], world[1], hit),
        ) / total;
        let blend = |w: Vec3| (w.x * normals[0] + w.y * normals[1] + w.z * normals[2]).normalize();
        let expected = shade_diffuse(&renderer.lighting(), blend(w));

        // Same pixel with weights taken straight from device space
        let device: Vec<Vec2> = world
            .iter()
            .map(|p| project_to_device(clip_matrix * p.extend(1.0), 100, 100).truncate())
            .collect();
        let edges = EdgeMatrix::new(device[0], device[1], device[2]).unwrap();
        let naive = shade_diffuse(
            &renderer.lighting(),
            blend(edges.weights(edges.numerators(Vec2::new(i as f32, j as f32)))),
        );

        let got = fb.color_at(i, j);
        assert!((got.r as i32 - expected.r as i32).abs() <= 1, "{:?} vs {:?}", got, expected);
        assert!((got.r as i32 - naive.r as i32).abs() > 50, "{:?} vs {:?}", got, naive);
    }

    #[test]
    fn test_perspective_weights_recover_world_centroid() {
        // A triangle receding steeply away from the camera
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 90.0, 1.0, 0.1, 100.0);
        let clip_matrix = camera.perspective_matrix() * camera.view_matrix();
        let world = [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -20.0),
        ];
        let clip: Vec<Vec4> = world.iter().map(|p| clip_matrix * p.extend(1.0)).collect();
        let device: Vec<Vec3> = clip.iter().map(|&c| project_to_device(c, 100, 100)).collect();

        let centroid = (world[0] + world[1] + world[2]) / 3.0;
        let centroid_px = project_to_device(clip_matrix * centroid.extend(1.0), 100, 100);

        let edges = EdgeMatrix::new(device[0].truncate(), device[1].truncate(), device[2].truncate()).unwrap();
        let naive = edges.weights(edges.numerators(centroid_px.truncate()));
        let correct = perspective_weights(naive, Vec3::new(clip[0].w, clip[1].w, clip[2].w));

        assert!((correct - Vec3::splat(1.0 / 3.0)).length() < 0.001);
        assert!((naive - Vec3::splat(1.0 / 3.0)).length() > 0.05);

        // A normal varying linearly over the triangle blends to its world-space centroid value
        let normals = [Vec3::X, Vec3::Y, Vec3::Z];
        let blended = correct.x * normals[0] + correct.y * normals[1] + correct.z * normals[2];
        assert!((blended - Vec3::splat(1.0 / 3.0)).length() < 0.001);
    }
}
