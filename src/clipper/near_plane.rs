//! Near-plane clipping in camera space.
//!
//! The camera looks down -Z, so a vertex is hidden when its z is greater than
//! the plane's z (too close to, or behind, the eye). Each input triangle
//! produces zero, one or two output triangles:
//!
//! ```text
//!  hidden   0 vertices  ->  the triangle itself
//!           1 vertex    ->  the remaining quad, split in two
//!           2 vertices  ->  the remaining corner triangle
//!           3 vertices  ->  nothing
//! ```
//!
//! Vertex order is preserved, so back-face culling still works afterwards.

use crate::geometry::{TexVertex, Triangle};

/// Result of clipping one triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Clipped {
    None,
    One(Triangle),
    Two(Triangle, Triangle),
}

impl Clipped {
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Two(..) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn iter(&self) -> impl Iterator<Item = Triangle> {
        let (triangles, len) = match *self {
            Self::None => ([Triangle::default(); 2], 0),
            Self::One(a) => ([a, Triangle::default()], 1),
            Self::Two(a, b) => ([a, b], 2),
        };
        triangles.into_iter().take(len)
    }
}

/// Clips a camera-space triangle against the plane `z = near_z`.
///
/// `near_z` must be negative. Texture and world coordinates of new vertices
/// are interpolated with the same parameter as the position.
pub fn clip_near(triangle: &Triangle, near_z: f32) -> Clipped {
    let hidden = triangle.verts.map(|v| v.space.z > near_z);
    match hidden.iter().filter(|&&h| h).count() {
        0 => Clipped::One(*triangle),
        1 => {
            let first = hidden.iter().position(|&h| h).unwrap_or(0);
            let t = triangle.rotated(first);
            let [a, b, c] = t.verts;
            let ab = intersect(&a, &b, near_z);
            let ac = intersect(&a, &c, near_z);
            Clipped::Two(
                Triangle::new([ab, b, c], t.texture),
                Triangle::new([ab, c, ac], t.texture),
            )
        }
        2 => {
            let first = hidden.iter().position(|&h| !h).unwrap_or(0);
            let t = triangle.rotated(first);
            let [a, b, c] = t.verts;
            Clipped::One(Triangle::new(
                [a, intersect(&a, &b, near_z), intersect(&a, &c, near_z)],
                t.texture,
            ))
        }
        _ => Clipped::None,
    }
}

/// The point on edge `from -> to` where it crosses `z = near_z`. Exactly one
/// of the two vertices is hidden, so the edge is never parallel to the plane.
#[inline]
fn intersect(from: &TexVertex, to: &TexVertex, near_z: f32) -> TexVertex {
    let t = (near_z - from.space.z) / (to.space.z - from.space.z);
    let mut vertex = from.lerp(to, t);
    vertex.space.z = near_z;
    vertex
}
