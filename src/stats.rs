//! Per-frame counters.
//!
//! Every worker fills its own [`FrameStats`] and the renderer merges them, so
//! nothing is shared while a frame is in flight.

use std::fmt;
use std::ops::AddAssign;
use std::time::Duration;

/// What happened to the geometry of one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub models_submitted: usize,
    /// Models skipped whole: entirely behind the near plane, or excluded
    /// from a shadow pass.
    pub models_rejected: usize,
    pub triangles_submitted: usize,
    /// Triangles entirely behind the near plane.
    pub triangles_clipped_away: usize,
    /// Triangles that clipping split in two.
    pub triangles_split: usize,
    pub triangles_backface: usize,
    pub triangles_degenerate: usize,
    pub triangles_offscreen: usize,
    /// Render jobs handed to the rasterizer.
    pub jobs: usize,
    /// Pixels that passed the depth test and were written.
    pub pixels_shaded: u64,
    /// Wall time of the clip-and-setup stage.
    pub setup_time: Duration,
    /// Wall time of the rasterize-and-resolve stage.
    pub raster_time: Duration,
}

impl FrameStats {
    pub fn merge(&mut self, other: &FrameStats) {
        *self += *other;
    }
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, rhs: FrameStats) {
        self.models_submitted += rhs.models_submitted;
        self.models_rejected += rhs.models_rejected;
        self.triangles_submitted += rhs.triangles_submitted;
        self.triangles_clipped_away += rhs.triangles_clipped_away;
        self.triangles_split += rhs.triangles_split;
        self.triangles_backface += rhs.triangles_backface;
        self.triangles_degenerate += rhs.triangles_degenerate;
        self.triangles_offscreen += rhs.triangles_offscreen;
        self.jobs += rhs.jobs;
        self.pixels_shaded += rhs.pixels_shaded;
        self.setup_time += rhs.setup_time;
        self.raster_time += rhs.raster_time;
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "models {}/{} rejected, triangles {} (clipped {}, split {}, backface {}, degenerate {}, offscreen {}), \
             jobs {}, pixels {}, setup {:.2?}, raster {:.2?}",
            self.models_rejected,
            self.models_submitted,
            self.triangles_submitted,
            self.triangles_clipped_away,
            self.triangles_split,
            self.triangles_backface,
            self.triangles_degenerate,
            self.triangles_offscreen,
            self.jobs,
            self.pixels_shaded,
            self.setup_time,
            self.raster_time,
        )
    }
}
