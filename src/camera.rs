//! Camera pose.
//!
//! # Coordinate System
//!
//! Right-handed world space. In camera space the eye sits at the origin,
//! X points right, Y points up and the camera looks down **-Z**.
//!
//! # Orientation
//!
//! Orientation is three angles (radians) about the X, Y and Z axes. The
//! camera's orientation matrix is `Rx(x) · Ry(y) · Rz(z)`; the world-to-camera
//! transform built by [`CoordinateTransformer::prepare`] is its inverse,
//! `Rz(-z) · Ry(-y) · Rx(-x)`, applied after translating by the eye.
//!
//! [`CoordinateTransformer::prepare`]: crate::transform::CoordinateTransformer::prepare

use crate::math::{Mat4, Vec3};

/// Position and Euler angles of a viewer. Mutated by the caller between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    position: Vec3,
    angles: Vec3,
}

impl Camera {
    pub fn new(position: Vec3, angles: Vec3) -> Self {
        Self { position, angles }
    }

    /// Creates a camera at `position` looking toward `target`, without roll.
    ///
    /// Returns a camera with zero angles when the two points coincide.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let direction = target - position;
        if direction.magnitude() <= f32::EPSILON {
            return Self::new(position, Vec3::ZERO);
        }
        let d = direction.normalize();
        // forward = (-sin y, sin x cos y, -cos x cos y) for zero roll.
        // cos y takes the sign that keeps x within [-pi/2, pi/2], so the
        // camera's up vector never points below the horizon.
        let horizontal = (d.y * d.y + d.z * d.z).sqrt();
        let cos_y = if d.z > 0.0 { -horizontal } else { horizontal };
        let y = (-d.x).atan2(cos_y);
        let x = if horizontal <= f32::EPSILON {
            0.0
        } else {
            (d.y / cos_y).atan2(-d.z / cos_y)
        };
        Self::new(position, Vec3::new(x, y, 0.0))
    }

    // ============ Position ============

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.position = position;
        self
    }

    /// Moves by a world-space delta.
    pub fn translate(&mut self, delta: Vec3) -> &mut Self {
        self.position = self.position + delta;
        self
    }

    /// Moves along the viewing direction.
    pub fn move_forward(&mut self, distance: f32) -> &mut Self {
        let forward = self.forward();
        self.translate(forward * distance)
    }

    // ============ Orientation ============

    pub fn angles(&self) -> Vec3 {
        self.angles
    }

    pub fn set_angles(&mut self, angles: Vec3) -> &mut Self {
        self.angles = angles;
        self
    }

    /// Adds a delta to each angle.
    pub fn rotate(&mut self, delta: Vec3) -> &mut Self {
        self.angles = self.angles + delta;
        self
    }

    /// Camera-to-world rotation.
    pub fn orientation(&self) -> Mat4 {
        Mat4::rotation_x(self.angles.x) * Mat4::rotation_y(self.angles.y) * Mat4::rotation_z(self.angles.z)
    }

    /// Viewing direction in world space (normalized).
    pub fn forward(&self) -> Vec3 {
        self.orientation().transform_direction(Vec3::new(0.0, 0.0, -1.0))
    }

    /// Camera's right direction in world space (normalized).
    pub fn right(&self) -> Vec3 {
        self.orientation().transform_direction(Vec3::new(1.0, 0.0, 0.0))
    }
}
