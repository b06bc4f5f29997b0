//! Scene loading and saving
//!
//! Uses RON (Rusty Object Notation) for human-readable scene files.

use std::fs;
use std::path::Path;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::mesh::{cube, sphere, MeshError, TriangleMesh};
use crate::rasterizer::{rotate, scale, translate, Camera, DiffuseRenderer, DrawStats, RasterSettings, RasterTarget, HEIGHT, WIDTH};

/// Error type for scene loading
#[derive(Debug)]
pub enum SceneError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    ValidationError(String),
    MeshError(MeshError),
}

impl From<std::io::Error> for SceneError {
    fn from(e: std::io::Error) -> Self {
        SceneError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for SceneError {
    fn from(e: ron::error::SpannedError) -> Self {
        SceneError::ParseError(e)
    }
}

impl From<ron::Error> for SceneError {
    fn from(e: ron::Error) -> Self {
        SceneError::SerializeError(e)
    }
}

impl From<MeshError> for SceneError {
    fn from(e: MeshError) -> Self {
        SceneError::MeshError(e)
    }
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::IoError(e) => write!(f, "IO error: {}", e),
            SceneError::ParseError(e) => write!(f, "Parse error: {}", e),
            SceneError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            SceneError::ValidationError(e) => write!(f, "Validation error: {}", e),
            SceneError::MeshError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SceneError {}

/// Largest output width or height; the viewer uploads frames as textures with 16-bit sides
pub const MAX_OUTPUT_SIZE: usize = u16::MAX as usize;

/// Camera placement; aspect ratio comes from the output size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraDesc {
    pub eye: Vec3,
    pub look: Vec3,
    pub up: Vec3,
    /// Horizontal field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

/// Directional light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightDesc {
    /// Towards the light, normalized by the renderer
    pub direction: Vec3,
    pub color: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MeshKind {
    Cube,
    /// Unit sphere with this many latitude bands
    Sphere(usize),
}

/// Model transform: scale, then rotate, then translate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub translate: Vec3,
    pub rotate_axis: Vec3,
    pub rotate_degrees: f32,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translate: Vec3::ZERO,
            rotate_axis: Vec3::Y,
            rotate_degrees: 0.0,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        translate(self.translate)
            * rotate(self.rotate_degrees, self.rotate_axis)
            * scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub mesh: MeshKind,
    /// Diffuse coefficient (Kd)
    pub diffuse: Vec3,
    #[serde(default)]
    pub transform: Transform,
    /// Spin about world +y in degrees per second, applied after `transform`
    #[serde(default)]
    pub spin: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub width: usize,
    pub height: usize,
    pub background: Vec3,
    pub camera: CameraDesc,
    pub light: LightDesc,
    pub ambient: Vec3,
    #[serde(default)]
    pub settings: RasterSettings,
    pub objects: Vec<SceneObject>,
}

impl Scene {
    /// Three spinning ellipsoids over a checkerboard of flattened spheres
    pub fn demo() -> Self {
        let reddish = Vec3::new(1.0, 0.6, 0.6);
        let greenish = Vec3::new(0.6, 1.0, 0.6);
        let blueish = Vec3::new(0.6, 0.6, 1.0);
        let ellipsoid = |diffuse: Vec3, s: Vec3| SceneObject {
            mesh: MeshKind::Sphere(15),
            diffuse,
            transform: Transform { scale: s, ..Transform::default() },
            spin: 72.0,
        };

        let mut objects = vec![
            ellipsoid(reddish, Vec3::new(1.0, 4.0, 4.0)),
            ellipsoid(greenish, Vec3::new(4.0, 1.0, 4.0)),
            ellipsoid(blueish, Vec3::new(4.0, 4.0, 1.0)),
        ];

        const COUNT: i32 = 3;
        for j in -COUNT..COUNT {
            for i in -COUNT..COUNT {
                if (i + j).rem_euclid(2) == 0 {
                    objects.push(SceneObject {
                        mesh: MeshKind::Sphere(10),
                        diffuse: Vec3::splat(0.8),
                        transform: Transform {
                            translate: Vec3::new(5.0 * i as f32, -4.5, 5.0 * j as f32),
                            scale: Vec3::new(3.0, 0.5, 3.0),
                            ..Transform::default()
                        },
                        spin: 0.0,
                    });
                }
            }
        }

        Self {
            width: WIDTH,
            height: HEIGHT,
            background: Vec3::ZERO,
            camera: CameraDesc {
                eye: Vec3::new(0.0, 0.0, 10.0),
                look: Vec3::NEG_Z,
                up: Vec3::Y,
                fov: 80.0,
                near: 0.1,
                far: 100.0,
            },
            light: LightDesc {
                direction: Vec3::ONE,
                color: Vec3::ONE,
            },
            ambient: Vec3::splat(0.2),
            settings: RasterSettings::default(),
            objects,
        }
    }

    /// Camera described by the scene, with the output's aspect ratio
    pub fn camera(&self) -> Camera {
        let c = &self.camera;
        let aspect = self.width as f32 / self.height as f32;
        Camera::new(c.eye, c.look, c.up, c.fov, aspect, c.near, c.far)
    }

    /// Reject scenes that would produce a broken camera or empty output
    pub fn validate(&self) -> Result<(), SceneError> {
        let invalid = |msg: String| Err(SceneError::ValidationError(msg));

        if self.width == 0 || self.height == 0 {
            return invalid(format!("output size {}x{} is empty", self.width, self.height));
        }
        if self.width > MAX_OUTPUT_SIZE || self.height > MAX_OUTPUT_SIZE {
            return invalid(format!(
                "output size {}x{} exceeds {} pixels per side",
                self.width, self.height, MAX_OUTPUT_SIZE
            ));
        }

        let c = &self.camera;
        let vectors = [c.eye, c.look, c.up, self.background, self.light.direction, self.light.color, self.ambient];
        if !vectors.iter().all(|v| v.is_finite()) || ![c.fov, c.near, c.far].iter().all(|f| f.is_finite()) {
            return invalid("non-finite number in camera or lighting".to_string());
        }
        if c.near <= 0.0 || c.far <= c.near {
            return invalid(format!("bad clip range: near {} far {}", c.near, c.far));
        }
        if c.fov <= 0.0 || c.fov >= 180.0 {
            return invalid(format!("field of view {} out of range", c.fov));
        }
        if c.look.cross(c.up).length_squared() < f32::EPSILON {
            return invalid("look and up vectors are parallel or zero".to_string());
        }

        for (idx, obj) in self.objects.iter().enumerate() {
            let t = &obj.transform;
            let finite = obj.diffuse.is_finite()
                && t.translate.is_finite()
                && t.scale.is_finite()
                && t.rotate_axis.is_finite()
                && t.rotate_degrees.is_finite()
                && obj.spin.is_finite();
            if !finite {
                return invalid(format!("object {}: non-finite number", idx));
            }
            if t.rotate_axis.length_squared() < f32::EPSILON {
                return invalid(format!("object {}: zero rotation axis", idx));
            }
            if let MeshKind::Sphere(segments) = obj.mesh {
                if segments < 3 {
                    return invalid(format!("object {}: sphere needs at least 3 segments, got {}", idx, segments));
                }
            }
        }
        Ok(())
    }
}

/// A validated scene with its meshes built, ready to draw every frame
pub struct PreparedScene {
    scene: Scene,
    meshes: Vec<TriangleMesh>,
}

impl PreparedScene {
    pub fn new(scene: Scene) -> Result<Self, SceneError> {
        scene.validate()?;
        let meshes = scene
            .objects
            .iter()
            .map(|obj| match obj.mesh {
                MeshKind::Cube => Ok(cube()),
                MeshKind::Sphere(segments) => sphere(segments),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { scene, meshes })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Clear `target` and draw every object as seen from `camera`, `time`
    /// seconds into the animation
    pub fn render<T: RasterTarget + ?Sized>(
        &self,
        renderer: &mut DiffuseRenderer,
        target: &mut T,
        camera: &Camera,
        time: f32,
    ) -> DrawStats {
        renderer.clear(target, self.scene.background);
        renderer.set_camera(camera);
        renderer.set_light(self.scene.light.direction, self.scene.light.color);
        renderer.set_ambient(self.scene.ambient);

        let mut stats = DrawStats::default();
        for (obj, mesh) in self.scene.objects.iter().zip(&self.meshes) {
            renderer.set_model(rotate(obj.spin * time, Vec3::Y) * obj.transform.matrix());
            renderer.set_diffuse_coefficient(obj.diffuse);
            stats += renderer.draw(target, mesh);
        }
        stats
    }
}

/// Load a scene from a RON file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<Scene, SceneError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let scene = load_scene_from_str(&contents)?;
    log::info!("Loaded scene: {} ({} objects)", path.as_ref().display(), scene.objects.len());
    Ok(scene)
}

/// Load a scene from a RON string
pub fn load_scene_from_str(s: &str) -> Result<Scene, SceneError> {
    let scene: Scene = ron::from_str(s)?;
    scene.validate()?;
    Ok(scene)
}

/// Save a scene to a RON file
pub fn save_scene<P: AsRef<Path>>(scene: &Scene, path: P) -> Result<(), SceneError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(scene, config)?;
    fs::write(path, contents)?;
    Ok(())
}
