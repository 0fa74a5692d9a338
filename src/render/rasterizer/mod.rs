//! Barycentric triangle rasterization.
//!
//! # Algorithm Overview
//!
//! For every job the rasterizer walks the rows of the job's bounding box that
//! belong to the current band, [`LANES`] pixels at a time:
//!
//! 1. Evaluate the three barycentric weights at the pixel centers.
//! 2. A pixel is inside iff all three weights are non-negative.
//! 3. Interpolate the reciprocal depth `w = 1/z` and keep the lanes where
//!    `w` is smaller than the stored depth (nearer, since `z < 0`).
//! 4. Hand the surviving lanes to a [`PixelShader`], which may discard some.
//! 5. Scatter depth, color and world position of what is left.
//!
//! # Bands
//!
//! Render targets are split into horizontal bands of whole rows and each band
//! is rasterized by one worker. A job overlapping several bands is visited by
//! each of them, restricted to that band's rows, so no pixel is shaded twice
//! and bands never need to synchronize.
//!
//! # Depth Ordering
//!
//! The depth comparison is strict. For fragments at distinct depths the
//! nearest one wins whatever the submission order; at equal depth the first
//! one submitted wins.

mod job;
mod shader;

pub use job::{Rejection, RenderJob, ScreenRect, MIN_SCREEN_AREA};
pub use shader::{
    fog_factor, DepthOnlyShader, Fragment, LevelShader, PixelShader, Shading, WIREFRAME_EPSILON,
};

use super::buffer::{BufferRows, DEPTH_CLEAR};
use super::lanes::{F32s, Mask, LANES};
use crate::colors::Rgba;
use crate::math::Vec4;

/// The rows of every render buffer a single band owns.
pub struct BandTarget<'a> {
    pub depth: BufferRows<'a, f32>,
    pub color: Option<BufferRows<'a, Rgba>>,
    pub world: Option<BufferRows<'a, Vec4>>,
}

impl BandTarget<'_> {
    /// Resets depth to [`DEPTH_CLEAR`] and the other buffers to zero.
    pub fn clear(&mut self) {
        self.depth.fill(DEPTH_CLEAR);
        if let Some(color) = &mut self.color {
            color.fill(Rgba::ZERO);
        }
        if let Some(world) = &mut self.world {
            world.fill(Vec4::ZERO);
        }
    }
}

/// Rasterizes the part of `job` inside `target`'s rows.
///
/// Returns the number of pixels written.
pub fn rasterize<S: PixelShader>(job: &RenderJob<'_>, target: &mut BandTarget<'_>, shader: &S) -> u64 {
    let rows = target.depth.rows();
    let rect = job.rect;
    let y_start = rect.y0.max(rows.start);
    let y_end = (rect.y1 + 1).min(rows.end);

    let mut written = 0;
    for y in y_start..y_end {
        let py = F32s::splat(y as f32 + 0.5);
        for x in (rect.x0..=rect.x1).step_by(LANES) {
            let px = F32s::ramp(x as f32 + 0.5, 1.0);
            let weights = job.weights(px, py);

            let zero = F32s::splat(0.0);
            let inside = Mask::first(rect.x1 + 1 - x)
                & weights[0].ge(zero)
                & weights[1].ge(zero)
                & weights[2].ge(zero);
            if !inside.any() {
                continue;
            }

            let rcp_z = job.rcp_z(&weights);
            let stored = F32s(target.depth.load_lanes(x, y, DEPTH_CLEAR));
            let mut mask = inside & rcp_z.lt(stored);
            if !mask.any() {
                continue;
            }

            let mut fragments = [Fragment::default(); LANES];
            for lane in mask.iter() {
                let lambda = weights.map(|w| w.lane(lane));
                match shader.shade(lambda, rcp_z.lane(lane)) {
                    Some(fragment) => fragments[lane] = fragment,
                    None => mask.clear(lane),
                }
            }
            if !mask.any() {
                continue;
            }

            target.depth.store_lanes(x, y, &rcp_z.0, mask);
            if let Some(color) = &mut target.color {
                color.store_lanes(x, y, &fragments.map(|f| f.color), mask);
            }
            if let Some(world) = &mut target.world {
                world.store_lanes(x, y, &fragments.map(|f| f.world), mask);
            }
            written += u64::from(mask.count());
        }
    }
    written
}
