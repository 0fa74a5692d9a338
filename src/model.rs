//! Renderable models.
//!
//! A [`Model`] is a batch of world-space triangles sharing one texture. Models
//! are built once when the level loads and are read-only while rendering.

use crate::geometry::{TextureIndex, Triangle};
use crate::math::Vec3;

/// An immutable list of triangles sharing a texture.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    triangles: Vec<Triangle>,
    texture: TextureIndex,
    bounds: [Vec3; 8],
    light: Option<f32>,
}

impl Model {
    /// Creates a model. Every triangle is re-tagged with `texture`.
    pub fn new(name: impl Into<String>, texture: TextureIndex, mut triangles: Vec<Triangle>) -> Self {
        for triangle in &mut triangles {
            triangle.texture = texture;
        }
        let bounds = bounding_box_corners(&triangles);
        Self {
            name: name.into(),
            triangles,
            texture,
            bounds,
            light: None,
        }
    }

    /// Fixes the light multiplier for every pixel of this model.
    pub fn with_light(mut self, light: f32) -> Self {
        self.light = Some(light);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn texture(&self) -> TextureIndex {
        self.texture
    }

    /// The 8 corners of the world-space axis-aligned bounding box.
    pub fn bounds(&self) -> &[Vec3; 8] {
        &self.bounds
    }

    /// Light multiplier override, if any.
    pub fn light(&self) -> Option<f32> {
        self.light
    }
}

fn bounding_box_corners(triangles: &[Triangle]) -> [Vec3; 8] {
    let mut points = triangles
        .iter()
        .flat_map(|t| t.verts.iter())
        .map(|v| v.world.to_vec3());
    let Some(first) = points.next() else {
        return [Vec3::ZERO; 8];
    };
    let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));

    [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ]
}

/// Supplier of level geometry, e.g. a map loader.
pub trait GeometrySource {
    fn models(&self) -> &[Model];
}

impl GeometrySource for Vec<Model> {
    fn models(&self) -> &[Model] {
        self
    }
}

impl GeometrySource for [Model] {
    fn models(&self) -> &[Model] {
        self
    }
}
