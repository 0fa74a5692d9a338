//! End-to-end rendering through `Renderer`.

use approx::assert_abs_diff_eq;
use levelrast::prelude::*;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

const RED: u32 = 0xFFFF_0000;
const GREEN: u32 = 0xFF00_FF00;
const WHITE: u32 = 0xFFFF_FFFF;
const BLACK: u32 = 0xFF00_0000;

struct Scene {
    textures: TextureAtlas,
    red: TextureIndex,
    green: TextureIndex,
    white: TextureIndex,
}

impl Scene {
    fn new() -> Self {
        let mut textures = TextureAtlas::new();
        let solid = |argb| Texture::from_argb(1, 1, vec![argb]).unwrap();
        let red = textures.add(solid(RED));
        let green = textures.add(solid(GREEN));
        let white = textures.add(solid(WHITE));
        Self {
            textures,
            red,
            green,
            white,
        }
    }
}

/// Square facing +Z (toward the default camera) at depth `z`.
fn wall(name: &str, z: f32, half: f32, texture: TextureIndex) -> Model {
    let corners = [
        Vec3::new(-half, -half, z),
        Vec3::new(half, -half, z),
        Vec3::new(half, half, z),
        Vec3::new(-half, half, z),
    ];
    Model::new(name, texture, Triangle::quad(corners, (8.0, 8.0), texture).to_vec())
}

/// Square facing +Y at height `y`, centered on the origin.
fn floor(name: &str, y: f32, half: f32, texture: TextureIndex) -> Model {
    let corners = [
        Vec3::new(-half, y, half),
        Vec3::new(half, y, half),
        Vec3::new(half, y, -half),
        Vec3::new(-half, y, -half),
    ];
    Model::new(name, texture, Triangle::quad(corners, (8.0, 8.0), texture).to_vec())
}

fn renderer(threads: usize) -> Renderer {
    Renderer::new(WIDTH, HEIGHT, threads).unwrap()
}

fn pixel(renderer: &Renderer, x: u32, y: u32) -> u32 {
    renderer.frame()[(y * WIDTH + x) as usize]
}

#[test]
fn test_full_screen_wall_fills_the_frame() {
    let scene = Scene::new();
    let models = vec![wall("wall", -5.0, 10.0, scene.red)];
    let mut renderer = renderer(2);

    let stats = renderer
        .render_frame(&models, &Camera::default(), &RenderSettings::default(), &scene.textures, &[])
        .unwrap();

    assert!(renderer.frame().iter().all(|&p| p == RED));
    assert_eq!(stats.models_submitted, 1);
    assert_eq!(stats.triangles_submitted, 2);
    assert_eq!(stats.jobs, 2);
    assert!(stats.pixels_shaded >= u64::from(WIDTH * HEIGHT));
    // Depth holds 1 / z.
    assert_abs_diff_eq!(renderer.depth_buffer().get(10, 10).unwrap(), -0.2, epsilon = 1e-5);
}

#[test]
fn test_nearest_surface_wins_in_any_order() {
    let scene = Scene::new();
    let near = wall("near", -3.0, 10.0, scene.green);
    let far = wall("far", -6.0, 10.0, scene.red);

    for models in [vec![near.clone(), far.clone()], vec![far.clone(), near.clone()]] {
        let mut renderer = renderer(3);
        renderer
            .render_frame(&models, &Camera::default(), &RenderSettings::default(), &scene.textures, &[])
            .unwrap();
        assert!(renderer.frame().iter().all(|&p| p == GREEN));
    }
}

#[test]
fn test_output_is_identical_for_any_worker_count() {
    let scene = Scene::new();
    let mut models = vec![
        floor("floor", -1.0, 20.0, scene.white),
        wall("back", -12.0, 6.0, scene.red),
        wall("small", -4.0, 0.5, scene.green),
    ];
    models.extend((0..5).map(|i| wall(&format!("panel {i}"), -5.0 - i as f32, 0.3 + 0.2 * i as f32, scene.green)));
    let camera = Camera::looking_at(Vec3::new(0.7, 0.4, 1.0), Vec3::new(0.0, -0.5, -8.0));
    let settings = RenderSettings {
        fog_enabled: true,
        ..Default::default()
    };

    let render = |threads| {
        let mut renderer = renderer(threads);
        renderer
            .render_frame(&models, &camera, &settings, &scene.textures, &[])
            .unwrap();
        renderer.frame().to_vec()
    };
    let reference = render(0);
    for threads in [1, 2, 5, 8] {
        assert_eq!(render(threads), reference, "{threads} workers");
    }
}

#[test]
fn test_geometry_behind_the_camera_is_rejected_or_clipped() {
    let scene = Scene::new();
    let models = vec![
        wall("behind", 5.0, 10.0, scene.red),
        floor("floor", -1.0, 20.0, scene.white),
    ];
    let mut renderer = renderer(2);
    let stats = renderer
        .render_frame(&models, &Camera::default(), &RenderSettings::default(), &scene.textures, &[])
        .unwrap();

    assert_eq!(stats.models_rejected, 1);
    // One floor triangle loses two corners, the other loses one and is split.
    // The remaining corner of the first lies off the right edge of the view.
    assert_eq!(stats.triangles_split, 1);
    assert_eq!(stats.jobs + stats.triangles_offscreen, 3);
    assert!(stats.jobs >= 1);
    assert_eq!(pixel(&renderer, WIDTH / 2, HEIGHT - 1), WHITE);
    assert_eq!(pixel(&renderer, WIDTH / 2, 0), BLACK);
    assert!(renderer.depth_buffer().as_slice().iter().all(|d| !d.is_nan()));
}

#[test]
fn test_backfaces_are_culled_only_when_enabled() {
    let scene = Scene::new();
    let front = wall("wall", -5.0, 10.0, scene.red);
    let back = Model::new(
        "reversed",
        scene.red,
        front.triangles().iter().map(Triangle::flipped).collect(),
    );
    let models = vec![back];
    let mut renderer = renderer(1);

    let stats = renderer
        .render_frame(&models, &Camera::default(), &RenderSettings::default(), &scene.textures, &[])
        .unwrap();
    assert_eq!(stats.triangles_backface, 2);
    assert!(renderer.frame().iter().all(|&p| p == BLACK));

    let settings = RenderSettings {
        backface_culling_enabled: false,
        ..Default::default()
    };
    renderer
        .render_frame(&models, &Camera::default(), &settings, &scene.textures, &[])
        .unwrap();
    assert!(renderer.frame().iter().all(|&p| p == RED));
}

#[test]
fn test_transparent_texels_show_what_is_behind() {
    let mut scene = Scene::new();
    let grate = scene
        .textures
        .add(Texture::checkerboard(2, 1, GREEN, 0x0000_0000));
    let models = vec![wall("grate", -3.0, 10.0, grate), wall("back", -6.0, 10.0, scene.red)];
    let mut renderer = renderer(2);
    renderer
        .render_frame(&models, &Camera::default(), &RenderSettings::default(), &scene.textures, &[])
        .unwrap();

    let frame = renderer.frame();
    assert!(frame.contains(&GREEN));
    assert!(frame.contains(&RED));
    assert!(frame.iter().all(|&p| p == GREEN || p == RED));
}

#[test]
fn test_supersampling_smooths_edges() {
    let scene = Scene::new();
    let corners = [
        TexVertex::new(Vec3::new(-1.0, -1.0, -5.0), 0.0, 0.0),
        TexVertex::new(Vec3::new(1.0, -1.0, -5.0), 1.0, 0.0),
        TexVertex::new(Vec3::new(0.0, 1.0, -5.0), 0.0, 1.0),
    ];
    let models = vec![Model::new("tri", scene.red, vec![Triangle::new(corners, scene.red)])];
    let partial = |frame: &[u32]| {
        frame
            .iter()
            .any(|&p| (1..255).contains(&((p >> 16) & 0xFF)))
    };
    let mut renderer = renderer(2);

    renderer
        .render_frame(&models, &Camera::default(), &RenderSettings::default(), &scene.textures, &[])
        .unwrap();
    assert!(!partial(renderer.frame()));

    let settings = RenderSettings {
        ssaa_mult: 2,
        ..Default::default()
    };
    renderer
        .render_frame(&models, &Camera::default(), &settings, &scene.textures, &[])
        .unwrap();
    assert!(partial(renderer.frame()));
    assert_eq!(renderer.frame().len(), (WIDTH * HEIGHT) as usize);
}

#[test]
fn test_distant_geometry_fades_into_fog() {
    let scene = Scene::new();
    let models = vec![wall("far", -50.0, 100.0, scene.red)];
    let mut renderer = renderer(2);
    let settings = RenderSettings {
        fog_enabled: true,
        fog_intensity: 0.02,
        fog_color: Rgba::rgb(0.0, 0.0, 1.0),
        ..Default::default()
    };
    renderer
        .render_frame(&models, &Camera::default(), &settings, &scene.textures, &[])
        .unwrap();
    assert_eq!(pixel(&renderer, WIDTH / 2, HEIGHT / 2), 0xFF00_00FF);

    let settings = RenderSettings {
        fog_effect_version: FogEffect::Exponential,
        ..settings
    };
    renderer
        .render_frame(&models, &Camera::default(), &settings, &scene.textures, &[])
        .unwrap();
    // 1 - e^-1 of the way to blue.
    let center = renderer.color_buffer().get(WIDTH as usize / 2, HEIGHT as usize / 2).unwrap();
    assert_abs_diff_eq!(center.b, 1.0 - (-1.0f32).exp(), epsilon = 1e-3);
    assert_abs_diff_eq!(center.r, (-1.0f32).exp(), epsilon = 1e-3);
}

#[test]
fn test_shadow_map_darkens_occluded_floor() {
    let scene = Scene::new();
    let models = vec![
        floor("floor", 0.0, 10.0, scene.white),
        floor("blocker", 2.0, 1.0, scene.white),
    ];
    let settings = RenderSettings {
        world_positions_enabled: true,
        ..Default::default()
    };
    let mut renderer = renderer(3);

    let light = Camera::looking_at(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
    let mut map = ShadowMap::new(64, 64, 1.0, light, 0.8);
    let shadow_stats = renderer.render_shadow_map(&mut map, &models, &settings).unwrap();
    assert!(shadow_stats.pixels_shaded > 0);

    let camera = Camera::looking_at(Vec3::new(0.0, 6.0, 8.0), Vec3::ZERO);
    renderer
        .render_frame(&models, &camera, &settings, &scene.textures, std::slice::from_ref(&map))
        .unwrap();

    let world = renderer.world_buffer().unwrap();
    let color = renderer.color_buffer();
    let (mut shadowed, mut lit) = (0, 0);
    for y in 0..HEIGHT as usize {
        for x in 0..WIDTH as usize {
            let p = world.get(x, y).unwrap();
            if p.w < 0.5 || p.y.abs() > 0.01 {
                continue;
            }
            let r = color.get(x, y).unwrap().r;
            let reach = p.x.abs().max(p.z.abs());
            if reach < 0.7 {
                assert_abs_diff_eq!(r, settings.ambient_light, epsilon = 1e-4);
                shadowed += 1;
            } else if reach > 1.6 && reach < 4.5 {
                assert_abs_diff_eq!(r, settings.ambient_light + 0.8, epsilon = 1e-4);
                lit += 1;
            }
        }
    }
    assert!(shadowed > 0, "no floor pixel under the blocker was visible");
    assert!(lit > 0);
}

#[test]
fn test_light_from_several_shadow_maps_accumulates() {
    let scene = Scene::new();
    let models = vec![
        floor("floor", 0.0, 10.0, scene.white),
        floor("blocker", 2.0, 1.0, scene.white),
    ];
    let settings = RenderSettings {
        world_positions_enabled: true,
        ..Default::default()
    };
    let mut renderer = Renderer::new(256, 192, 3).unwrap();

    // Overhead light shades |x|, |z| < 1.25; the offset one shades
    // -0.5 < x < 2.0, |z| < 1.25.
    let overhead = Camera::looking_at(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
    let offset = Camera::looking_at(Vec3::new(-3.0, 10.0, 0.0), Vec3::new(-3.0, 0.0, 0.0));
    let mut maps = [
        ShadowMap::new(256, 256, 1.0, overhead, 0.8),
        ShadowMap::new(256, 256, 1.0, offset, 0.5),
    ];
    for map in &mut maps {
        renderer.render_shadow_map(map, &models, &settings).unwrap();
    }

    let camera = Camera::looking_at(Vec3::new(0.0, 6.0, 8.0), Vec3::ZERO);
    renderer
        .render_frame(&models, &camera, &settings, &scene.textures, &maps)
        .unwrap();

    let ambient = settings.ambient_light;
    let world = renderer.world_buffer().unwrap();
    let color = renderer.color_buffer();
    let mut seen = [0; 4];
    for y in 0..world.height() {
        for x in 0..world.width() {
            let p = world.get(x, y).unwrap();
            if p.w < 0.5 || p.y.abs() > 0.01 {
                continue;
            }
            let r = color.get(x, y).unwrap().r;
            let (px, pz) = (p.x, p.z.abs());
            let expected = if pz < 0.7 && px > -0.2 && px < 0.9 {
                (0, ambient)
            } else if pz < 0.7 && px > 1.5 && px < 1.8 {
                (1, ambient + 0.8)
            } else if pz < 0.7 && px > -1.05 && px < -0.75 {
                (2, ambient + 0.5)
            } else if pz > 1.6 || px > 2.3 || px < -1.6 {
                (3, ambient + 0.8 + 0.5)
            } else {
                continue;
            };
            assert_abs_diff_eq!(r, expected.1, epsilon = 1e-4);
            seen[expected.0] += 1;
        }
    }
    assert!(seen.iter().all(|&count| count > 0), "{seen:?}");
}

#[test]
fn test_sky_texture_casts_no_shadow() {
    let scene = Scene::new();
    let models = vec![floor("sky lid", 5.0, 10.0, scene.green)];
    let settings = RenderSettings {
        sky_texture: Some(scene.green),
        ..Default::default()
    };
    let renderer = renderer(1);
    let light = Camera::looking_at(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
    let mut map = ShadowMap::new(16, 16, 1.0, light, 1.0);

    let stats = renderer.render_shadow_map(&mut map, &models, &settings).unwrap();
    assert_eq!(stats.models_rejected, 1);
    assert_eq!(stats.pixels_shaded, 0);
    assert!(map.is_lit(Vec4::point(0.0, 0.0, 0.0)));
}

struct Level(Vec<Model>);

impl GeometrySource for Level {
    fn models(&self) -> &[Model] {
        &self.0
    }
}

#[test]
fn test_renders_from_a_geometry_source() {
    let scene = Scene::new();
    let level = Level(vec![wall("wall", -5.0, 10.0, scene.green)]);
    let mut renderer = renderer(2);
    renderer
        .render_frame(level.models(), &Camera::default(), &RenderSettings::default(), &scene.textures, &[])
        .unwrap();
    assert_eq!(pixel(&renderer, 0, 0), GREEN);
    let image = renderer.to_image();
    assert_eq!(image.get_pixel(0, 0).0, [0, 255, 0, 255]);
}
