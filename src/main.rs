//! Headless demo: renders a small procedural level with one shadow-casting
//! light and writes the last frame as a PNG.
//!
//! ```bash
//! RUST_LOG=debug cargo run --release -- --frames 16 --ssaa 2 --output level.png
//! ```

use std::f32::consts::TAU;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use levelrast::prelude::*;

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(about = "Render a procedural level on the CPU")]
struct Opts {
    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 400)]
    height: u32,

    /// Worker threads; defaults to the available parallelism.
    #[arg(long)]
    threads: Option<usize>,

    /// Supersampling factor per axis (1-4).
    #[arg(long, default_value_t = 1)]
    ssaa: u32,

    /// Frames to render while orbiting the camera.
    #[arg(long, default_value_t = 8)]
    frames: u32,

    #[arg(long, value_name = "FILE", default_value = "frame.png")]
    output: PathBuf,

    /// Shadow map resolution (square). 0 disables shadows.
    #[arg(long, default_value_t = 512)]
    shadow_size: u32,

    #[arg(long)]
    wireframe: bool,

    #[arg(long)]
    fog: bool,

    #[arg(long)]
    dither: bool,
}

/// Procedurally built level: a floor, a ring of pillars, a see-through
/// grate and a sky box.
struct DemoLevel {
    models: Vec<Model>,
    sky: TextureIndex,
}

impl GeometrySource for DemoLevel {
    fn models(&self) -> &[Model] {
        &self.models
    }
}

/// Outward-facing box between `min` and `max`, texture repeating every
/// `texel_scale` texels per world unit.
fn cuboid(min: Vec3, max: Vec3, texel_scale: f32, texture: TextureIndex) -> Vec<Triangle> {
    let size = (max - min) * texel_scale;
    let faces = [
        // +X
        ([(max.x, min.y, max.z), (max.x, min.y, min.z), (max.x, max.y, min.z), (max.x, max.y, max.z)], (size.z, size.y)),
        // -X
        ([(min.x, min.y, min.z), (min.x, min.y, max.z), (min.x, max.y, max.z), (min.x, max.y, min.z)], (size.z, size.y)),
        // +Z
        ([(min.x, min.y, max.z), (max.x, min.y, max.z), (max.x, max.y, max.z), (min.x, max.y, max.z)], (size.x, size.y)),
        // -Z
        ([(max.x, min.y, min.z), (min.x, min.y, min.z), (min.x, max.y, min.z), (max.x, max.y, min.z)], (size.x, size.y)),
        // +Y
        ([(min.x, max.y, max.z), (max.x, max.y, max.z), (max.x, max.y, min.z), (min.x, max.y, min.z)], (size.x, size.z)),
        // -Y
        ([(min.x, min.y, min.z), (max.x, min.y, min.z), (max.x, min.y, max.z), (min.x, min.y, max.z)], (size.x, size.z)),
    ];
    faces
        .into_iter()
        .flat_map(|(corners, texels)| {
            Triangle::quad(corners.map(|(x, y, z)| Vec3::new(x, y, z)), texels, texture)
        })
        .collect()
}

fn build_level(textures: &mut TextureAtlas) -> DemoLevel {
    let floor = textures.add(Texture::checkerboard(64, 8, 0xFFB0_A890, 0xFF60_5848));
    let stone = textures.add(Texture::checkerboard(32, 4, 0xFF90_6040, 0xFF70_4830));
    let grate = textures.add(Texture::checkerboard(32, 4, 0xFF30_3030, 0x0000_0000));
    let sky = textures.add(Texture::checkerboard(16, 16, 0xFF60_90D0, 0xFF60_90D0));

    let mut models = Vec::new();

    let s = 20.0;
    let floor_quad = Triangle::quad(
        [
            Vec3::new(-s, 0.0, s),
            Vec3::new(s, 0.0, s),
            Vec3::new(s, 0.0, -s),
            Vec3::new(-s, 0.0, -s),
        ],
        (2.0 * s * 16.0, 2.0 * s * 16.0),
        floor,
    );
    models.push(Model::new("floor", floor, floor_quad.to_vec()));

    for i in 0..6 {
        let angle = i as f32 / 6.0 * TAU;
        let center = Vec3::new(angle.cos() * 7.0, 0.0, angle.sin() * 7.0);
        let half = Vec3::new(0.6, 0.0, 0.6);
        let top = Vec3::new(0.0, 3.0 + i as f32 * 0.5, 0.0);
        models.push(Model::new(
            format!("pillar {i}"),
            stone,
            cuboid(center - half, center + half + top, 16.0, stone),
        ));
    }

    let grate_quad = Triangle::quad(
        [
            Vec3::new(-3.0, 2.5, 3.0),
            Vec3::new(3.0, 2.5, 3.0),
            Vec3::new(3.0, 2.5, -3.0),
            Vec3::new(-3.0, 2.5, -3.0),
        ],
        (96.0, 96.0),
        grate,
    );
    let grate_tris = grate_quad
        .iter()
        .flat_map(|t| [*t, t.flipped()])
        .collect();
    models.push(Model::new("grate", grate, grate_tris));

    // Seen from the inside, so every face is flipped.
    let sky_box = cuboid(Vec3::new(-200.0, -50.0, -200.0), Vec3::new(200.0, 150.0, 200.0), 1.0, sky)
        .iter()
        .map(Triangle::flipped)
        .collect();
    models.push(Model::new("sky", sky, sky_box).with_light(1.0));

    DemoLevel { models, sky }
}

fn main() -> Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let threads = opts
        .threads
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));

    let mut textures = TextureAtlas::new();
    let level = build_level(&mut textures);
    let models = level.models();

    let settings = RenderSettings {
        ssaa_mult: opts.ssaa,
        wireframe_enabled: opts.wireframe,
        fog_enabled: opts.fog,
        fog_effect_version: FogEffect::Exponential,
        fog_intensity: 0.03,
        dithering_enabled: opts.dither,
        sky_texture: Some(level.sky),
        ..Default::default()
    };

    let mut renderer = Renderer::new(opts.width, opts.height, threads).context("failed to create renderer")?;
    info!(
        "rendering {} models ({} triangles) at {}x{} on {} workers",
        models.len(),
        models.iter().map(Model::triangle_count).sum::<usize>(),
        opts.width,
        opts.height,
        threads
    );

    let mut shadow_maps = Vec::new();
    if opts.shadow_size > 0 {
        let light = Camera::looking_at(Vec3::new(12.0, 25.0, 10.0), Vec3::ZERO);
        let mut map = ShadowMap::new(opts.shadow_size, opts.shadow_size, 1.2, light, 0.8);
        let stats = renderer.render_shadow_map(&mut map, models, &settings)?;
        info!("shadow map: {stats}");
        shadow_maps.push(map);
    }

    let mut total = FrameStats::default();
    for frame in 0..opts.frames.max(1) {
        let angle = frame as f32 / opts.frames.max(1) as f32 * TAU;
        let eye = Vec3::new(angle.cos() * 14.0, 5.0, angle.sin() * 14.0);
        let camera = Camera::looking_at(eye, Vec3::new(0.0, 1.5, 0.0));

        let stats = renderer.render_frame(models, &camera, &settings, &textures, &shadow_maps)?;
        info!("frame {frame}: {stats}");
        total += stats;
    }
    info!("total: {total}");

    renderer
        .to_image()
        .save(&opts.output)
        .with_context(|| format!("failed to write {}", opts.output.display()))?;
    info!("wrote {}", opts.output.display());
    Ok(())
}
