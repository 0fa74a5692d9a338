//! Vertex and triangle types flowing through the pipeline.
//!
//! The same [`TexVertex`] layout is reused by every stage; what `space`
//! means depends on where the vertex is:
//!
//! | Stage             | `space`                          | `tex`                |
//! |-------------------|----------------------------------|----------------------|
//! | Input             | world position (w = 1)           | `(u, v, 0)`          |
//! | After transform   | camera position (looks down -Z)  | `(u, v, 0)`          |
//! | After projection  | pixel position, `z` = camera z   | `(u/z, v/z, 1/z)`    |
//!
//! `world` always keeps the original world position.

use crate::math::{Vec3, Vec4};

/// Index into the texture source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureIndex(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TexVertex {
    pub space: Vec4,
    /// Texture coordinates in texels; the third slot holds the reciprocal
    /// depth once the vertex has been projected.
    pub tex: Vec3,
    pub world: Vec4,
}

impl TexVertex {
    /// A world-space vertex with texel coordinates `(u, v)`.
    pub fn new(position: Vec3, u: f32, v: f32) -> Self {
        let world = Vec4::from(position);
        Self {
            space: world,
            tex: Vec3::new(u, v, 0.0),
            world,
        }
    }

    /// Interpolates every attribute with the same parameter.
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            space: self.space.lerp(other.space, t),
            tex: self.tex.lerp(other.tex, t),
            world: self.world.lerp(other.world, t),
        }
    }
}

/// Three vertices and the texture they are drawn with.
///
/// Vertex order is significant: front faces are counter-clockwise when seen
/// from the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Triangle {
    pub verts: [TexVertex; 3],
    pub texture: TextureIndex,
}

impl Triangle {
    pub fn new(verts: [TexVertex; 3], texture: TextureIndex) -> Self {
        Self { verts, texture }
    }

    /// Two triangles covering the planar quad `corners`, listed
    /// counter-clockwise as seen from its front. The texture spans
    /// `texels.0` texels from the first corner to the second and `texels.1`
    /// from the second to the third.
    pub fn quad(corners: [Vec3; 4], texels: (f32, f32), texture: TextureIndex) -> [Triangle; 2] {
        let (w, h) = texels;
        let [a, b, c, d] = [
            TexVertex::new(corners[0], 0.0, h),
            TexVertex::new(corners[1], w, h),
            TexVertex::new(corners[2], w, 0.0),
            TexVertex::new(corners[3], 0.0, 0.0),
        ];
        [Triangle::new([a, b, c], texture), Triangle::new([a, c, d], texture)]
    }

    /// The same triangle seen from the other side.
    pub fn flipped(&self) -> Self {
        let [a, b, c] = self.verts;
        Self::new([a, c, b], self.texture)
    }

    /// Rotates the vertices so `first` becomes index 0, keeping the winding.
    pub(crate) fn rotated(&self, first: usize) -> Self {
        let v = &self.verts;
        Self {
            verts: [v[first % 3], v[(first + 1) % 3], v[(first + 2) % 3]],
            texture: self.texture,
        }
    }
}
