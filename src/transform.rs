//! World-to-camera and camera-to-pixel transforms.
//!
//! [`CoordinateTransformer::prepare`] caches one combined matrix per frame;
//! after that the transformer is read-only and shared by every worker.

use crate::camera::Camera;
use crate::geometry::TexVertex;
use crate::math::{Mat4, Vec2, Vec3, Vec4};

#[derive(Debug, Clone)]
pub struct CoordinateTransformer {
    width: u32,
    height: u32,
    fov_mult: f32,
    /// Added to perspective-divided coordinates so that (0, 0) lands on the
    /// center of the target.
    screen_shift: Vec2,
    matrix: Mat4,
}

impl CoordinateTransformer {
    /// Creates a transformer for a `width`x`height` target.
    ///
    /// Projected coordinates are scaled by the target height on both axes,
    /// so the aspect ratio is preserved.
    pub fn new(width: u32, height: u32, fov_mult: f32) -> Self {
        let aspect = width as f32 / height.max(1) as f32;
        Self {
            width,
            height,
            fov_mult,
            screen_shift: Vec2::new(aspect * 0.5, 0.5),
            matrix: Mat4::identity(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fov_mult(&self) -> f32 {
        self.fov_mult
    }

    pub fn set_fov_mult(&mut self, fov_mult: f32) {
        self.fov_mult = fov_mult;
    }

    /// The cached world-to-camera matrix.
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Builds the combined rotate-then-translate matrix for a camera pose:
    /// `Rz(-a.z) · Ry(-a.y) · Rx(-a.x) · T(-position)`.
    pub fn prepare(&mut self, position: Vec3, angles: Vec3) {
        self.matrix = Mat4::rotation_z(-angles.z)
            * Mat4::rotation_y(-angles.y)
            * Mat4::rotation_x(-angles.x)
            * Mat4::translation(-position);
    }

    pub fn prepare_camera(&mut self, camera: &Camera) {
        self.prepare(camera.position(), camera.angles());
    }

    /// World space (homogeneous, w = 1) to camera space.
    #[inline]
    pub fn rotate_and_translate(&self, point: Vec4) -> Vec4 {
        self.matrix * point
    }

    /// Perspective divide of a camera-space point in front of the eye (z < 0).
    #[inline]
    pub fn perspective_divide(&self, camera: Vec4) -> Vec2 {
        let rcp_z = 1.0 / camera.z;
        Vec2::new(-camera.x * rcp_z * self.fov_mult, camera.y * rcp_z * self.fov_mult)
    }

    /// Perspective-divided coordinates to pixels (row 0 at the top).
    #[inline]
    pub fn screen_space_to_pixels(&self, point: Vec2) -> Vec2 {
        (point + self.screen_shift) * self.height as f32
    }

    /// Camera space straight to pixels.
    #[inline]
    pub fn project(&self, camera: Vec4) -> Vec2 {
        self.screen_space_to_pixels(self.perspective_divide(camera))
    }

    /// Projects a camera-space vertex for rasterization: `space` becomes
    /// `(pixel x, pixel y, camera z, 1/z)` and the texture coordinates are
    /// divided by depth, with `1/z` stored in the third slot.
    #[inline]
    pub fn project_vertex(&self, vertex: &TexVertex) -> TexVertex {
        let pixel = self.project(vertex.space);
        let rcp_z = 1.0 / vertex.space.z;
        TexVertex {
            space: Vec4::new(pixel.x, pixel.y, vertex.space.z, rcp_z),
            tex: Vec3::new(vertex.tex.x * rcp_z, vertex.tex.y * rcp_z, rcp_z),
            world: vertex.world,
        }
    }
}
