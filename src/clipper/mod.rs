//! Geometry clipping.
//!
//! Only the near plane is clipped. Triangles crossing the screen edges are
//! kept whole; the rasterizer clamps their bounding boxes to the target.

pub mod near_plane;

pub use near_plane::{clip_near, Clipped};
