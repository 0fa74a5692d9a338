//! Per-frame render configuration.

use thiserror::Error;

use crate::colors::Rgba;
use crate::geometry::TextureIndex;

/// Largest supported supersampling factor per axis.
pub const MAX_SSAA_MULT: u32 = 4;

/// Fog falloff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FogEffect {
    /// `fog = clamp(distance * intensity, 0, 1)`
    #[default]
    Linear,
    /// `fog = 1 - exp(-distance * intensity)`
    Exponential,
}

/// Options recognized by [`Renderer::render_frame`](crate::Renderer::render_frame).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Exponent applied to the light multiplier.
    pub gamma: f32,
    /// Camera-space z of the near clip plane. Must be negative.
    pub near_plane_z: f32,
    /// Perspective scale; larger values narrow the field of view.
    pub fov_mult: f32,
    pub wireframe_enabled: bool,
    pub wireframe_color: Rgba,
    pub backface_culling_enabled: bool,
    pub fog_enabled: bool,
    pub fog_intensity: f32,
    pub fog_effect_version: FogEffect,
    pub fog_color: Rgba,
    /// Ordered dithering when quantizing to 8 bits per channel.
    pub dithering_enabled: bool,
    /// Supersampling factor per axis, `1..=MAX_SSAA_MULT`.
    pub ssaa_mult: u32,
    /// Also fill the world-position buffer.
    pub world_positions_enabled: bool,
    /// Light that reaches surfaces hidden from every shadow-casting light.
    pub ambient_light: f32,
    /// Texture whose geometry never casts shadows.
    pub sky_texture: Option<TextureIndex>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            near_plane_z: -0.1,
            fov_mult: 1.0,
            wireframe_enabled: false,
            wireframe_color: Rgba::WHITE,
            backface_culling_enabled: true,
            fog_enabled: false,
            fog_intensity: 0.02,
            fog_effect_version: FogEffect::Linear,
            fog_color: Rgba::rgb(0.5, 0.5, 0.55),
            dithering_enabled: false,
            ssaa_mult: 1,
            world_positions_enabled: false,
            ambient_light: 0.3,
            sky_texture: None,
        }
    }
}

/// Rejected settings values.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("near plane z must be negative and finite, got {0}")]
    NearPlane(f32),

    #[error("fov multiplier must be positive and finite, got {0}")]
    FovMult(f32),

    #[error("gamma must be positive and finite, got {0}")]
    Gamma(f32),

    #[error("fog intensity must be non-negative and finite, got {0}")]
    FogIntensity(f32),

    #[error("ssaa multiplier must be in 1..={MAX_SSAA_MULT}, got {0}")]
    SsaaMult(u32),
}

impl RenderSettings {
    /// Checks every numeric option.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.near_plane_z.is_finite() && self.near_plane_z < 0.0) {
            return Err(SettingsError::NearPlane(self.near_plane_z));
        }
        if !(self.fov_mult.is_finite() && self.fov_mult > 0.0) {
            return Err(SettingsError::FovMult(self.fov_mult));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(SettingsError::Gamma(self.gamma));
        }
        if !(self.fog_intensity.is_finite() && self.fog_intensity >= 0.0) {
            return Err(SettingsError::FogIntensity(self.fog_intensity));
        }
        if !(1..=MAX_SSAA_MULT).contains(&self.ssaa_mult) {
            return Err(SettingsError::SsaaMult(self.ssaa_mult));
        }
        Ok(())
    }
}
