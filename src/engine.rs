//! Core rendering engine.
//!
//! The [`Renderer`] owns the worker pool and every per-frame buffer. Each call
//! to [`Renderer::render_frame`] runs the full pipeline (clip, set up,
//! rasterize, resolve) and leaves the packed result in [`Renderer::frame`].

use log::{debug, warn};
use thiserror::Error;

use crate::camera::Camera;
use crate::colors::Rgba;
use crate::math::Vec4;
use crate::model::Model;
use crate::render::buffer::{ColorBuffer, DepthBuffer, WorldBuffer, DEPTH_CLEAR};
use crate::render::pipeline::{self, Output, Pass, Targets};
use crate::render::rasterizer::Shading;
use crate::scheduler::Scheduler;
use crate::settings::{RenderSettings, SettingsError};
use crate::shadow::ShadowMap;
use crate::stats::FrameStats;
use crate::texture::TextureSource;
use crate::transform::CoordinateTransformer;

/// Errors reported by [`Renderer`].
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render settings")]
    Settings(#[from] SettingsError),

    #[error("render target must be at least 1x1, got {width}x{height}")]
    EmptyTarget { width: u32, height: u32 },

    #[error("failed to start render workers")]
    Spawn(#[from] std::io::Error),
}

pub struct Renderer {
    scheduler: Scheduler,
    width: u32,
    height: u32,
    /// Supersampling factor the internal buffers are sized for.
    ssaa: u32,
    transformer: CoordinateTransformer,
    depth: DepthBuffer,
    color: ColorBuffer,
    world: Option<WorldBuffer>,
    /// Resolved ARGB8888 output, `width * height`.
    frame: Vec<u32>,
}

impl Renderer {
    /// Creates a renderer for a `width`x`height` output with `threads` worker
    /// threads. The calling thread helps as well, so 0 is valid.
    pub fn new(width: u32, height: u32, threads: usize) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyTarget { width, height });
        }
        let scheduler = Scheduler::new(threads)?;
        let (w, h) = (width as usize, height as usize);
        Ok(Self {
            scheduler,
            width,
            height,
            ssaa: 1,
            transformer: CoordinateTransformer::new(width, height, 1.0),
            depth: DepthBuffer::new(w, h, DEPTH_CLEAR),
            color: ColorBuffer::new(w, h, Rgba::ZERO),
            world: None,
            frame: vec![0; w * h],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Transformer used by the most recent frame, sized to the internal
    /// (supersampled) resolution.
    pub fn transformer(&self) -> &CoordinateTransformer {
        &self.transformer
    }

    /// Changes the output size. Buffers are reallocated on the next frame.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyTarget { width, height });
        }
        self.width = width;
        self.height = height;
        self.frame = vec![0; width as usize * height as usize];
        self.ssaa = 0;
        Ok(())
    }

    /// Sizes the internal buffers for `settings`.
    fn prepare_buffers(&mut self, settings: &RenderSettings) {
        let ssaa = settings.ssaa_mult;
        let (w, h) = ((self.width * ssaa) as usize, (self.height * ssaa) as usize);
        if ssaa != self.ssaa {
            self.ssaa = ssaa;
            self.transformer = CoordinateTransformer::new(self.width * ssaa, self.height * ssaa, settings.fov_mult);
            self.depth.resize(w, h, DEPTH_CLEAR);
            self.color.resize(w, h, Rgba::ZERO);
            debug!("internal resolution {w}x{h} (ssaa {ssaa})");
        }
        self.transformer.set_fov_mult(settings.fov_mult);

        if settings.world_positions_enabled {
            let stale = self
                .world
                .as_ref()
                .map_or(true, |world| world.width() != w || world.height() != h);
            if stale {
                self.world = Some(WorldBuffer::new(w, h, Vec4::ZERO));
            }
        } else {
            self.world = None;
        }
    }

    /// Renders one frame of `models` seen from `camera`.
    ///
    /// `shadow_maps` must already be rendered (see
    /// [`Renderer::render_shadow_map`]); pass an empty slice for unshadowed
    /// lighting.
    pub fn render_frame(
        &mut self,
        models: &[Model],
        camera: &Camera,
        settings: &RenderSettings,
        textures: &dyn TextureSource,
        shadow_maps: &[ShadowMap],
    ) -> Result<FrameStats, RenderError> {
        if let Err(err) = settings.validate() {
            warn!("rejected render settings: {err}");
            return Err(err.into());
        }
        self.prepare_buffers(settings);
        self.transformer.prepare_camera(camera);

        let pass = Pass {
            transformer: &self.transformer,
            near_z: settings.near_plane_z,
            cull_backfaces: settings.backface_culling_enabled,
            skip_texture: None,
        };
        let targets = Targets {
            depth: &mut self.depth,
            color: Some(&mut self.color),
            world: self.world.as_mut(),
            output: Some(Output {
                frame: &mut self.frame,
                width: self.width as usize,
                ssaa: self.ssaa as usize,
                dither: settings.dithering_enabled,
            }),
        };
        let shading = Shading::new(textures, settings, shadow_maps);
        let stats = pipeline::run(&self.scheduler, models, &pass, targets, Some(&shading));

        debug!("frame: {stats}");
        Ok(stats)
    }

    /// Renders the depth of `models` from `map`'s light into the map,
    /// skipping models textured with `settings.sky_texture`.
    pub fn render_shadow_map(
        &self,
        map: &mut ShadowMap,
        models: &[Model],
        settings: &RenderSettings,
    ) -> Result<FrameStats, RenderError> {
        settings.validate()?;
        let (transformer, depth) = map.render_parts(settings.near_plane_z);
        let pass = Pass {
            transformer,
            near_z: settings.near_plane_z,
            cull_backfaces: settings.backface_culling_enabled,
            skip_texture: settings.sky_texture,
        };
        let targets = Targets {
            depth,
            color: None,
            world: None,
            output: None,
        };
        let stats = pipeline::run(&self.scheduler, models, &pass, targets, None);

        debug!("shadow map: {stats}");
        Ok(stats)
    }

    /// The last resolved frame, ARGB8888, row-major, `width * height`.
    pub fn frame(&self) -> &[u32] {
        &self.frame
    }

    /// Returns the rendered frame as bytes (ARGB8888 format)
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: u32 has no padding and a stricter alignment than u8; the
        // byte slice covers exactly the frame's memory and borrows `self`.
        unsafe { std::slice::from_raw_parts(self.frame.as_ptr() as *const u8, self.frame.len() * 4) }
    }

    /// Copies the last frame into an RGBA image.
    pub fn to_image(&self) -> image::RgbaImage {
        let width = self.width;
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            let [a, r, g, b] = self.frame[(y * width + x) as usize].to_be_bytes();
            image::Rgba([r, g, b, a])
        })
    }

    /// Internal-resolution color of the last frame.
    pub fn color_buffer(&self) -> &ColorBuffer {
        &self.color
    }

    /// Internal-resolution reciprocal depth of the last frame.
    pub fn depth_buffer(&self) -> &DepthBuffer {
        &self.depth
    }

    /// World positions of the last frame, if it enabled them.
    pub fn world_buffer(&self) -> Option<&WorldBuffer> {
        self.world.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureAtlas;

    #[test]
    fn test_empty_target_is_rejected() {
        assert!(matches!(
            Renderer::new(0, 10, 1),
            Err(RenderError::EmptyTarget { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut renderer = Renderer::new(8, 8, 0).unwrap();
        let settings = RenderSettings {
            ssaa_mult: 9,
            ..Default::default()
        };
        let result = renderer.render_frame(&[], &Camera::default(), &settings, &TextureAtlas::new(), &[]);
        assert!(matches!(result, Err(RenderError::Settings(SettingsError::SsaaMult(9)))));
    }

    #[test]
    fn test_buffers_follow_supersampling_and_world_flag() {
        let mut renderer = Renderer::new(6, 4, 2).unwrap();
        let settings = RenderSettings {
            ssaa_mult: 3,
            world_positions_enabled: true,
            ..Default::default()
        };
        let stats = renderer
            .render_frame(&[], &Camera::default(), &settings, &TextureAtlas::new(), &[])
            .unwrap();
        assert_eq!(stats.pixels_shaded, 0);
        assert_eq!(renderer.depth_buffer().width(), 18);
        assert_eq!(renderer.color_buffer().height(), 12);
        assert!(renderer.world_buffer().is_some());
        assert_eq!(renderer.frame().len(), 24);
        assert!(renderer.frame().iter().all(|&p| p == 0xFF00_0000));
        assert_eq!(renderer.as_bytes().len(), 96);

        renderer
            .render_frame(&[], &Camera::default(), &RenderSettings::default(), &TextureAtlas::new(), &[])
            .unwrap();
        assert_eq!(renderer.depth_buffer().width(), 6);
        assert!(renderer.world_buffer().is_none());
    }
}
