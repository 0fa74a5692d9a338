//! 4x4 transformation matrix using column-major convention.
//!
//! # Convention
//! - Vectors are **column vectors** on the right: `Mat4 * Vec`
//! - Translation is stored in the **last column**
//! - Transforms chain **right-to-left**: `A * B * v` applies B first, then A
//! - Rotations are counter-clockwise when looking down the axis toward the origin

use std::ops::Mul;

use super::vec3::Vec3;
use super::vec4::Vec4;

/// 4x4 matrix stored as `data[row][col]` with column-major convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    data: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4 {
    pub fn new(data: [[f32; 4]; 4]) -> Self {
        Mat4 { data }
    }

    pub fn identity() -> Self {
        Mat4::new([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a translation matrix.
    ///
    /// Translation is stored in the last column (column-major convention).
    pub fn translation(offset: Vec3) -> Self {
        Mat4::new([
            [1.0, 0.0, 0.0, offset.x],
            [0.0, 1.0, 0.0, offset.y],
            [0.0, 0.0, 1.0, offset.z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a rotation matrix around the X axis.
    pub fn rotation_x(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Mat4::new([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, c, -s, 0.0],
            [0.0, s, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a rotation matrix around the Y axis.
    pub fn rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Mat4::new([
            [c, 0.0, s, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [-s, 0.0, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a rotation matrix around the Z axis.
    pub fn rotation_z(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Mat4::new([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Transforms a direction (w=0), ignoring translation.
    pub fn transform_direction(&self, v: Vec3) -> Vec3 {
        (*self * Vec4::new(v.x, v.y, v.z, 0.0)).to_vec3()
    }
}

/// Matrix multiplication: Mat4 * Mat4.
///
/// For column-major convention, `A * B * v` applies B first, then A.
impl Mul<Mat4> for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Self::Output {
        let mut result = [[0.0f32; 4]; 4];

        for (row, out) in result.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = self.data[row][0] * rhs.data[0][col]
                    + self.data[row][1] * rhs.data[1][col]
                    + self.data[row][2] * rhs.data[2][col]
                    + self.data[row][3] * rhs.data[3][col];
            }
        }

        Mat4::new(result)
    }
}

/// Transform a Vec4 by a matrix: Mat4 * Vec4 (column vector).
impl Mul<Vec4> for Mat4 {
    type Output = Vec4;

    #[inline]
    fn mul(self, v: Vec4) -> Self::Output {
        let d = &self.data;
        Vec4::new(
            d[0][0] * v.x + d[0][1] * v.y + d[0][2] * v.z + d[0][3] * v.w,
            d[1][0] * v.x + d[1][1] * v.y + d[1][2] * v.z + d[1][3] * v.w,
            d[2][0] * v.x + d[2][1] * v.y + d[2][2] * v.z + d[2][3] * v.w,
            d[3][0] * v.x + d[3][1] * v.y + d[3][2] * v.z + d[3][3] * v.w,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_rotations_are_counter_clockwise() {
        let x = Mat4::rotation_z(FRAC_PI_2) * Vec4::point(1.0, 0.0, 0.0);
        assert_abs_diff_eq!(x.y, 1.0, epsilon = 1e-6);

        let y = Mat4::rotation_x(FRAC_PI_2) * Vec4::point(0.0, 1.0, 0.0);
        assert_abs_diff_eq!(y.z, 1.0, epsilon = 1e-6);

        let z = Mat4::rotation_y(FRAC_PI_2) * Vec4::point(0.0, 0.0, 1.0);
        assert_abs_diff_eq!(z.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_translation_ignores_directions() {
        let m = Mat4::translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(m * Vec4::point(0.0, 0.0, 0.0), Vec4::point(1.0, 2.0, 3.0));
        assert_eq!(m.transform_direction(Vec3::new(0.0, 0.0, 1.0)), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_mul_applies_right_to_left() {
        let m = Mat4::translation(Vec3::new(5.0, 0.0, 0.0)) * Mat4::rotation_z(FRAC_PI_2);
        let p = m * Vec4::point(1.0, 0.0, 0.0);
        assert_abs_diff_eq!(p.x, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-6);
    }
}
