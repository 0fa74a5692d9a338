//! Per-triangle setup.
//!
//! A [`RenderJob`] is built once for every projected triangle that survives
//! clipping. It caches what the per-pixel loop needs (the reciprocal signed
//! area and the clamped pixel bounding box) and is dropped at the end of the
//! frame.

use super::super::lanes::F32s;
use crate::geometry::{TextureIndex, Triangle};
use crate::math::Vec2;
use crate::model::Model;

/// Triangles with a smaller absolute screen area (in pixels²) are dropped.
pub const MIN_SCREEN_AREA: f32 = 1e-6;

/// Why a triangle produced no job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Zero (or non-finite) signed screen area.
    Degenerate,
    /// Seen from behind while back-face culling is enabled.
    Backface,
    /// No pixel center of the render target lies inside the bounding box.
    Offscreen,
}

/// Inclusive pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl ScreenRect {
    /// True when some row of `rows` falls inside the rectangle.
    pub fn overlaps_rows(&self, rows: &std::ops::Range<usize>) -> bool {
        rows.start <= self.y1 && self.y0 < rows.end
    }
}

/// A projected triangle ready for rasterization.
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'m> {
    /// Vertices in the projected layout: `space = (px, py, z, 1/z)`,
    /// `tex = (u/z, v/z, 1/z)`.
    pub triangle: Triangle,
    pub rcp_area: f32,
    pub rect: ScreenRect,
    pub model: &'m Model,
}

impl<'m> RenderJob<'m> {
    /// Validates a projected triangle against a `width`x`height` target.
    ///
    /// Front faces wind counter-clockwise as seen by the camera, which is a
    /// negative signed area once y points down the screen.
    pub fn setup(
        triangle: Triangle,
        model: &'m Model,
        width: usize,
        height: usize,
        cull_backfaces: bool,
    ) -> Result<Self, Rejection> {
        let [p0, p1, p2] = triangle.verts.map(|v| Vec2::new(v.space.x, v.space.y));

        let area = (p0 - p2).cross(p1 - p2);
        if !area.is_finite() || area.abs() < MIN_SCREEN_AREA {
            return Err(Rejection::Degenerate);
        }
        if cull_backfaces && area > 0.0 {
            return Err(Rejection::Backface);
        }

        // Pixel x covers the center x + 0.5.
        let min_x = (p0.x.min(p1.x).min(p2.x) - 0.5).ceil().max(0.0);
        let min_y = (p0.y.min(p1.y).min(p2.y) - 0.5).ceil().max(0.0);
        let max_x = (p0.x.max(p1.x).max(p2.x) - 0.5).floor().min(width as f32 - 1.0);
        let max_y = (p0.y.max(p1.y).max(p2.y) - 0.5).floor().min(height as f32 - 1.0);
        if width == 0 || height == 0 || min_x > max_x || min_y > max_y {
            return Err(Rejection::Offscreen);
        }

        Ok(Self {
            triangle,
            rcp_area: 1.0 / area,
            rect: ScreenRect {
                x0: min_x as usize,
                y0: min_y as usize,
                x1: max_x as usize,
                y1: max_y as usize,
            },
            model,
        })
    }

    pub fn texture(&self) -> TextureIndex {
        self.triangle.texture
    }

    /// Barycentric weights `(α, β, γ)` of the sample points `(px, py)`.
    ///
    /// ```text
    /// α = cross(r - v2, v1 - v2) / A
    /// β = cross(r - v0, v2 - v0) / A
    /// γ = cross(r - v1, v0 - v1) / A
    /// ```
    ///
    /// All three are non-negative exactly when the point is inside, for
    /// either winding, since they are normalized by the signed area `A`.
    #[inline]
    pub fn weights(&self, px: F32s, py: F32s) -> [F32s; 3] {
        let [v0, v1, v2] = self.triangle.verts.map(|v| Vec2::new(v.space.x, v.space.y));
        let edge = |from: Vec2, to: Vec2| {
            let d = to - from;
            ((px - from.x) * d.y - (py - from.y) * d.x) * self.rcp_area
        };
        [edge(v2, v1), edge(v0, v2), edge(v1, v0)]
    }

    /// Scalar version of [`RenderJob::weights`].
    pub fn weights_at(&self, x: f32, y: f32) -> [f32; 3] {
        self.weights(F32s::splat(x), F32s::splat(y)).map(|w| w.lane(0))
    }

    /// Interpolated reciprocal depth for the given weights.
    #[inline]
    pub fn rcp_z(&self, weights: &[F32s; 3]) -> F32s {
        let [v0, v1, v2] = &self.triangle.verts;
        weights[0] * v0.space.w + weights[1] * v1.space.w + weights[2] * v2.space.w
    }
}
