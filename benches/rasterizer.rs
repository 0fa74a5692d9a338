use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use levelrast::bench::{rasterize, BandTarget, ColorBuffer, DepthBuffer, DepthOnlyShader, RenderJob, Shading, DEPTH_CLEAR};
use levelrast::colors::Rgba;
use levelrast::prelude::*;

const BUFFER_WIDTH: usize = 800;
const BUFFER_HEIGHT: usize = 600;

/// Projected vertex at pixel (x, y), camera depth z.
fn vertex(x: f32, y: f32, z: f32) -> TexVertex {
    let rcp_z = 1.0 / z;
    TexVertex {
        space: Vec4::new(x, y, z, rcp_z),
        tex: Vec3::new(x * rcp_z, y * rcp_z, rcp_z),
        world: Vec4::point(x, y, z),
    }
}

fn screen_triangle(points: [(f32, f32); 3]) -> Triangle {
    Triangle::new(points.map(|(x, y)| vertex(x, y, -4.0)), TextureIndex(0))
}

fn small_triangle() -> Triangle {
    screen_triangle([(100.0, 100.0), (110.0, 120.0), (120.0, 100.0)])
}

fn medium_triangle() -> Triangle {
    screen_triangle([(100.0, 100.0), (200.0, 300.0), (300.0, 100.0)])
}

fn large_triangle() -> Triangle {
    screen_triangle([(50.0, 50.0), (400.0, 550.0), (750.0, 100.0)])
}

fn benchmark_single_triangle(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_triangle");

    let model = Model::new("bench", TextureIndex(0), Vec::new());
    let mut textures = TextureAtlas::new();
    textures.add(Texture::checkerboard(64, 8, 0xFFFF_FFFF, 0xFF00_0000));
    let settings = RenderSettings::default();
    let shading = Shading::new(&textures, &settings, &[]);

    for (name, triangle) in [
        ("small", small_triangle()),
        ("medium", medium_triangle()),
        ("large", large_triangle()),
    ] {
        let job = RenderJob::setup(triangle, &model, BUFFER_WIDTH, BUFFER_HEIGHT, true).unwrap();

        group.bench_with_input(BenchmarkId::new("depth_only", name), &job, |b, job| {
            let mut depth = DepthBuffer::new(BUFFER_WIDTH, BUFFER_HEIGHT, DEPTH_CLEAR);
            b.iter(|| {
                let mut bands = depth.bands_mut(&[0..BUFFER_HEIGHT]);
                let mut target = BandTarget {
                    depth: bands.remove(0),
                    color: None,
                    world: None,
                };
                target.clear();
                rasterize(black_box(job), &mut target, &DepthOnlyShader)
            });
        });

        group.bench_with_input(BenchmarkId::new("textured", name), &job, |b, job| {
            let mut depth = DepthBuffer::new(BUFFER_WIDTH, BUFFER_HEIGHT, DEPTH_CLEAR);
            let mut color = ColorBuffer::new(BUFFER_WIDTH, BUFFER_HEIGHT, Rgba::ZERO);
            b.iter(|| {
                let mut target = BandTarget {
                    depth: depth.bands_mut(&[0..BUFFER_HEIGHT]).remove(0),
                    color: Some(color.bands_mut(&[0..BUFFER_HEIGHT]).remove(0)),
                    world: None,
                };
                target.clear();
                rasterize(black_box(job), &mut target, &shading.shader_for(job))
            });
        });
    }

    group.finish();
}

/// A grid of upright quads in front of the camera.
fn wall_of_quads(texture: TextureIndex) -> Vec<Model> {
    (0..20)
        .map(|row| {
            let triangles = (0..20)
                .flat_map(|col| {
                    let x = col as f32 - 10.0;
                    let y = row as f32 - 10.0;
                    let z = -15.0 - ((row * 20 + col) % 7) as f32;
                    Triangle::quad(
                        [
                            Vec3::new(x, y, z),
                            Vec3::new(x + 0.9, y, z),
                            Vec3::new(x + 0.9, y + 0.9, z),
                            Vec3::new(x, y + 0.9, z),
                        ],
                        (16.0, 16.0),
                        texture,
                    )
                })
                .collect();
            Model::new(format!("row {row}"), texture, triangles)
        })
        .collect()
}

fn benchmark_full_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_frame");

    let mut textures = TextureAtlas::new();
    let texture = textures.add(Texture::checkerboard(64, 8, 0xFFFF_FFFF, 0xFF00_0000));
    let models = wall_of_quads(texture);
    let camera = Camera::default();
    let settings = RenderSettings::default();

    for threads in [0, 1, 4] {
        group.bench_with_input(BenchmarkId::new("800_triangles", threads), &threads, |b, &threads| {
            let mut renderer = Renderer::new(BUFFER_WIDTH as u32, BUFFER_HEIGHT as u32, threads).unwrap();
            b.iter(|| {
                renderer
                    .render_frame(black_box(&models), &camera, &settings, &textures, &[])
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_single_triangle, benchmark_full_frame);
criterion_main!(benches);
