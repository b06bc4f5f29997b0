//! Soft Render viewer
//!
//! Renders a scene with the software rasterizer every frame and shows the
//! framebuffer as a texture. Pass a `.ron` scene file as the first argument,
//! otherwise the built-in demo scene is used.
//!
//! Keys: A/D yaw, W/X pitch, Q/S roll, Up/Down move, Z/C zoom,
//! Space backface culling, T edge rule, P snapshot, Esc quit.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use macroquad::prelude::{
    clear_background, draw_text, draw_texture_ex, get_frame_time, is_key_down, is_key_pressed, next_frame,
    screen_height, screen_width, vec2, Color, Conf, DrawTextureParams, FilterMode, KeyCode, Texture2D, WHITE,
};
use soft_render::rasterizer::{Camera, DiffuseRenderer, DrawStats, EdgeRule, Framebuffer, HEIGHT, WIDTH};
use soft_render::world::{load_scene, PreparedScene, Scene};

/// Degrees per second for yaw/pitch/roll
const TURN_RATE: f32 = 60.0;
/// World units per second
const MOVE_RATE: f32 = 3.0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Soft Render v{}", VERSION),
        window_width: WIDTH as i32 * 3,
        window_height: HEIGHT as i32 * 3,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn steer(camera: Camera, dt: f32) -> Camera {
    let axis = |plus: KeyCode, minus: KeyCode| {
        (is_key_down(plus) as i32 - is_key_down(minus) as i32) as f32 * dt
    };

    let mut camera = camera;
    let yaw = axis(KeyCode::A, KeyCode::D);
    if yaw != 0.0 {
        camera = camera.yaw(yaw * TURN_RATE);
    }
    let pitch = axis(KeyCode::W, KeyCode::X);
    if pitch != 0.0 {
        camera = camera.pitch(pitch * TURN_RATE);
    }
    let roll = axis(KeyCode::S, KeyCode::Q);
    if roll != 0.0 {
        camera = camera.roll(roll * TURN_RATE);
    }
    let forward = axis(KeyCode::Up, KeyCode::Down);
    if forward != 0.0 {
        camera = camera.forward(forward * MOVE_RATE);
    }
    let zoom = axis(KeyCode::C, KeyCode::Z);
    if zoom != 0.0 {
        camera = camera.zoom(1.0 + zoom);
    }
    camera
}

fn status_line(renderer: &DiffuseRenderer, stats: &DrawStats) -> String {
    let settings = renderer.settings();
    format!(
        "cull {} | edges {:?} | {} tris, {} behind, {} culled, {} px",
        if settings.backface_cull { "on" } else { "off" },
        settings.edge_rule,
        stats.triangles,
        stats.behind_camera,
        stats.culled,
        stats.pixels_written,
    )
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    let scene = match std::env::args().nth(1) {
        Some(path) => match load_scene(&path) {
            Ok(scene) => scene,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
                return;
            }
        },
        None => Scene::demo(),
    };
    let prepared = match PreparedScene::new(scene) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid scene: {}", e);
            return;
        }
    };

    let (width, height) = (prepared.scene().width, prepared.scene().height);
    let (Ok(tex_width), Ok(tex_height)) = (u16::try_from(width), u16::try_from(height)) else {
        eprintln!("Output size {}x{} is too large to display", width, height);
        return;
    };
    let mut fb = Framebuffer::new(width, height);
    let mut camera = prepared.scene().camera();
    let mut renderer = DiffuseRenderer::new(prepared.scene().settings);
    let mut time = 0.0;
    let mut snapshots = 0;

    println!("=== Soft Render v{} ===", VERSION);

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        let dt = get_frame_time();
        time += dt;
        camera = steer(camera, dt);

        if is_key_pressed(KeyCode::Space) {
            let cull = !renderer.settings().backface_cull;
            renderer.set_backface_cull(cull);
            log::info!("Backface culling {}", if cull { "on" } else { "off" });
        }
        if is_key_pressed(KeyCode::T) {
            let rule = match renderer.settings().edge_rule {
                EdgeRule::Inclusive => EdgeRule::TopLeft,
                EdgeRule::TopLeft => EdgeRule::Inclusive,
            };
            renderer.set_edge_rule(rule);
            log::info!("Edge rule {:?}", rule);
        }

        let stats = prepared.render(&mut renderer, &mut fb.raster(), &camera, time);

        if is_key_pressed(KeyCode::P) {
            let path = format!("snapshot_{:03}.png", snapshots);
            match fb.save_png(&path) {
                Ok(()) => snapshots += 1,
                Err(e) => eprintln!("Failed to save {}: {}", path, e),
            }
        }

        clear_background(Color::from_rgba(30, 30, 35, 255));

        // Fit the framebuffer into the window, keeping its aspect
        let scale = (screen_width() / width as f32).min(screen_height() / height as f32);
        let (w, h) = (width as f32 * scale, height as f32 * scale);
        let texture = Texture2D::from_rgba8(tex_width, tex_height, &fb.pixels);
        texture.set_filter(FilterMode::Nearest);
        draw_texture_ex(
            &texture,
            (screen_width() - w) / 2.0,
            (screen_height() - h) / 2.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(w, h)),
                ..Default::default()
            },
        );
        draw_text(&status_line(&renderer, &stats), 10.0, 20.0, 20.0, WHITE);

        next_frame().await;
    }
}
