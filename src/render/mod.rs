//! Rendering internals: pixel buffers, the lane-batched rasterizer and the
//! frame pipeline that drives them.

pub mod buffer;
pub mod lanes;
pub(crate) mod pipeline;
pub mod rasterizer;
pub mod resolve;

pub use buffer::{Buffer2D, BufferRows, ColorBuffer, DepthBuffer, WorldBuffer, DEPTH_CLEAR};
pub use rasterizer::{BandTarget, PixelShader, Rejection, RenderJob, Shading};
