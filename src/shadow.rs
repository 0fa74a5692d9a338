//! Shadow maps.
//!
//! A shadow map is the depth buffer of a depth-only render from a light's
//! point of view. While shading, a surface point is lit by that light unless
//! the map holds something clearly nearer to the light at the point's
//! projection.

use crate::camera::Camera;
use crate::math::Vec4;
use crate::render::buffer::{DepthBuffer, DEPTH_CLEAR};
use crate::transform::CoordinateTransformer;

/// Relative depth tolerance of the occlusion test. Keeps surfaces from
/// shadowing themselves through depth quantization.
pub const SHADOW_BIAS: f32 = 0.01;

/// Depth map rendered from a light.
#[derive(Debug, Clone)]
pub struct ShadowMap {
    transformer: CoordinateTransformer,
    depth: DepthBuffer,
    light: Camera,
    intensity: f32,
    near_z: f32,
}

impl ShadowMap {
    /// A `width`x`height` map for a light at `light`, contributing
    /// `intensity` to every point it reaches.
    pub fn new(width: u32, height: u32, fov_mult: f32, light: Camera, intensity: f32) -> Self {
        let mut transformer = CoordinateTransformer::new(width, height, fov_mult);
        transformer.prepare_camera(&light);
        Self {
            transformer,
            depth: DepthBuffer::new(width as usize, height as usize, DEPTH_CLEAR),
            light,
            intensity,
            near_z: -0.1,
        }
    }

    pub fn light(&self) -> &Camera {
        &self.light
    }

    /// Moves the light. The map must be re-rendered afterwards.
    pub fn set_light(&mut self, light: Camera) {
        self.light = light;
        self.transformer.prepare_camera(&light);
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    pub fn transformer(&self) -> &CoordinateTransformer {
        &self.transformer
    }

    /// Near plane used by the most recent render.
    pub fn near_z(&self) -> f32 {
        self.near_z
    }

    pub(crate) fn render_parts(&mut self, near_z: f32) -> (&CoordinateTransformer, &mut DepthBuffer) {
        self.near_z = near_z;
        (&self.transformer, &mut self.depth)
    }

    /// True unless the map holds an occluder in front of `world`.
    ///
    /// Points behind the light's near plane or projecting outside the map
    /// count as lit.
    pub fn is_lit(&self, world: Vec4) -> bool {
        let camera = self.transformer.rotate_and_translate(world);
        if camera.z >= self.near_z {
            return true;
        }
        let pixel = self.transformer.project(camera);
        if !(pixel.x >= 0.0 && pixel.y >= 0.0) {
            return true;
        }
        let Some(stored) = self.depth.get(pixel.x as usize, pixel.y as usize) else {
            return true;
        };
        let rcp_z = 1.0 / camera.z;
        !(stored < rcp_z * (1.0 + SHADOW_BIAS))
    }
}
