//! Per-pixel shading.
//!
//! The rasterizer decides which pixels a triangle covers and whether they pass
//! the depth test. Everything after that, from attribute interpolation to the
//! final color, is the job of a [`PixelShader`]:
//!
//! - [`DepthOnlyShader`] keeps every fragment and computes nothing. Used for
//!   shadow maps.
//! - [`LevelShader`] samples the model texture and applies light, shadows, fog
//!   and the wireframe overlay.

use super::job::RenderJob;
use crate::colors::Rgba;
use crate::geometry::TextureIndex;
use crate::math::{Vec3, Vec4};
use crate::settings::{FogEffect, RenderSettings};
use crate::shadow::ShadowMap;
use crate::texture::TextureSource;

/// Pixels with a barycentric weight below this are painted with the
/// wireframe color when the overlay is enabled.
pub const WIREFRAME_EPSILON: f32 = 0.02;

/// Output of a shader for one pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fragment {
    pub color: Rgba,
    /// World position of the surface point (w = 1).
    pub world: Vec4,
}

/// Trait for per-pixel shading computations.
///
/// The rasterizer calls `shade()` for each pixel that is inside the triangle
/// and nearer than the stored depth, passing the barycentric weights
/// [λ₀, λ₁, λ₂] and the interpolated reciprocal depth. Returning `None`
/// discards the pixel: neither color nor depth is written.
pub trait PixelShader {
    fn shade(&self, lambda: [f32; 3], rcp_z: f32) -> Option<Fragment>;
}

/// Accepts every fragment without shading it.
pub struct DepthOnlyShader;

impl PixelShader for DepthOnlyShader {
    #[inline]
    fn shade(&self, _lambda: [f32; 3], _rcp_z: f32) -> Option<Fragment> {
        Some(Fragment::default())
    }
}

/// Read-only frame-wide inputs of [`LevelShader`].
#[derive(Clone, Copy)]
pub struct Shading<'a> {
    pub textures: &'a dyn TextureSource,
    pub settings: &'a RenderSettings,
    pub shadow_maps: &'a [ShadowMap],
}

impl<'a> Shading<'a> {
    pub fn new(
        textures: &'a dyn TextureSource,
        settings: &'a RenderSettings,
        shadow_maps: &'a [ShadowMap],
    ) -> Self {
        Self {
            textures,
            settings,
            shadow_maps,
        }
    }

    /// Sets up the shader for one job.
    pub fn shader_for(&self, job: &RenderJob<'_>) -> LevelShader<'a> {
        let verts = &job.triangle.verts;
        let texture = job.texture();
        LevelShader {
            textures: self.textures,
            settings: self.settings,
            shadow_maps: self.shadow_maps,
            texture,
            opaque: self.textures.is_opaque_only(texture),
            light: job.model.light().unwrap_or(1.0).powf(self.settings.gamma),
            tex: verts.map(|v| v.tex),
            world: verts.map(|v| v.world * v.space.w),
        }
    }
}

/// Textured, lit and fogged shading of level geometry.
pub struct LevelShader<'a> {
    textures: &'a dyn TextureSource,
    settings: &'a RenderSettings,
    shadow_maps: &'a [ShadowMap],
    texture: TextureIndex,
    opaque: bool,
    light: f32,
    /// `(u/z, v/z, 1/z)` per vertex.
    tex: [Vec3; 3],
    /// World position divided by z per vertex.
    world: [Vec4; 3],
}

impl LevelShader<'_> {
    /// Light reaching `world` from the shadow-casting lights.
    fn shadow_light(&self, world: Vec4) -> f32 {
        self.shadow_maps
            .iter()
            .filter(|map| map.is_lit(world))
            .map(ShadowMap::intensity)
            .sum::<f32>()
            + self.settings.ambient_light
    }
}

impl PixelShader for LevelShader<'_> {
    #[inline]
    fn shade(&self, lambda: [f32; 3], rcp_z: f32) -> Option<Fragment> {
        let [a, b, c] = lambda;
        let z = 1.0 / rcp_z;
        let [t0, t1, t2] = self.tex;
        let u = (a * t0.x + b * t1.x + c * t2.x) * z;
        let v = (a * t0.y + b * t1.y + c * t2.y) * z;

        let texel = self.textures.sample(self.texture, u, v);
        if !self.opaque && texel.a == 0.0 {
            return None;
        }

        let [w0, w1, w2] = self.world;
        let world = (w0 * a + w1 * b + w2 * c) * z;

        let mut light = self.light;
        if !self.shadow_maps.is_empty() {
            light *= self.shadow_light(world);
        }
        let mut color = texel.scale_rgb(light);

        let settings = self.settings;
        if settings.fog_enabled {
            let fog = fog_factor(settings.fog_effect_version, -z, settings.fog_intensity);
            color = Rgba {
                a: color.a,
                ..color.lerp(settings.fog_color, fog)
            };
        }
        if settings.wireframe_enabled && a.min(b).min(c) < WIREFRAME_EPSILON {
            color = settings.wireframe_color;
        }

        Some(Fragment { color, world })
    }
}

/// Fraction of fog color at camera distance `distance`, in `[0, 1]`.
#[inline]
pub fn fog_factor(effect: FogEffect, distance: f32, intensity: f32) -> f32 {
    match effect {
        FogEffect::Linear => (distance * intensity).clamp(0.0, 1.0),
        FogEffect::Exponential => 1.0 - (-distance * intensity).exp(),
    }
}
