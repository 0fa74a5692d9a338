//! A multi-threaded CPU rasterizer for textured level geometry.
//!
//! All of transformation, near-plane clipping, visibility, shading and
//! resolve run on the CPU. Work is spread over a fixed pool of threads by a
//! small dependency-aware task [`Scheduler`]: each frame first clips and sets
//! up triangles in parallel, then rasterizes disjoint scanline bands in
//! parallel.
//!
//! # Quick Start
//!
//! ```no_run
//! use levelrast::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut textures = TextureAtlas::new();
//! let floor = textures.add(Texture::checkerboard(64, 8, 0xFFC0C0C0, 0xFF404040));
//!
//! let models = vec![Model::new("floor", floor, Vec::new())];
//! let camera = Camera::looking_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO);
//!
//! let mut renderer = Renderer::new(320, 200, 4)?;
//! let stats = renderer.render_frame(&models, &camera, &RenderSettings::default(), &textures, &[])?;
//! println!("{stats}");
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod clipper;
pub mod colors;
pub mod distribute;
pub mod engine;
pub mod geometry;
pub mod math;
pub mod model;
pub mod render;
pub mod scheduler;
pub mod settings;
pub mod shadow;
pub mod stats;
pub mod texture;
pub mod transform;

pub use camera::Camera;
pub use engine::{RenderError, Renderer};
pub use geometry::{TexVertex, TextureIndex, Triangle};
pub use model::{GeometrySource, Model};
pub use scheduler::{Scheduler, TaskId, TaskStatus};
pub use settings::{FogEffect, RenderSettings, SettingsError};
pub use shadow::ShadowMap;
pub use stats::FrameStats;
pub use texture::{Texture, TextureAtlas, TextureError, TextureSource};

/// Prelude module for convenient imports.
///
/// # Example
/// ```ignore
/// use levelrast::prelude::*;
/// ```
pub mod prelude {
    pub use crate::camera::Camera;
    pub use crate::colors::Rgba;
    pub use crate::engine::{RenderError, Renderer};
    pub use crate::geometry::{TexVertex, TextureIndex, Triangle};
    pub use crate::math::{Mat4, Vec2, Vec3, Vec4};
    pub use crate::model::{GeometrySource, Model};
    pub use crate::settings::{FogEffect, RenderSettings};
    pub use crate::shadow::ShadowMap;
    pub use crate::stats::FrameStats;
    pub use crate::texture::{Texture, TextureAtlas, TextureSource};
}

/// Module exposing internals for benchmarking. Not part of the stable API.
pub mod bench {
    pub use crate::clipper::clip_near;
    pub use crate::render::buffer::{ColorBuffer, DepthBuffer, WorldBuffer, DEPTH_CLEAR};
    pub use crate::render::rasterizer::{rasterize, BandTarget, DepthOnlyShader, RenderJob, Shading};
}
