//! Color types and packing helpers.
//!
//! The pipeline shades in floating point [`Rgba`]; the final frame is packed
//! to ARGB8888 (`0xAARRGGBB`) only when resolving.

use std::ops::{Add, Mul};

/// Linear floating point color, channels nominally in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    /// Color buffer clear value.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub fn from_argb(color: u32) -> Self {
        let a = ((color >> 24) & 0xFF) as f32 / 255.0;
        let r = ((color >> 16) & 0xFF) as f32 / 255.0;
        let g = ((color >> 8) & 0xFF) as f32 / 255.0;
        let b = (color & 0xFF) as f32 / 255.0;
        Self::new(r, g, b, a)
    }

    /// Packs to ARGB8888, clamping every channel.
    pub fn to_argb(self) -> u32 {
        pack_color(self.r, self.g, self.b, self.a)
    }

    /// Scales the color channels, leaving alpha untouched.
    #[inline]
    pub fn scale_rgb(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor, self.a)
    }

    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }
}

impl Add for Rgba {
    type Output = Rgba;

    fn add(self, rhs: Rgba) -> Self::Output {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl Mul<f32> for Rgba {
    type Output = Rgba;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

/// Packs float channels in `[0, 1]` into ARGB8888.
#[inline]
pub fn pack_color(r: f32, g: f32, b: f32, a: f32) -> u32 {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(a) << 24) | (channel(r) << 16) | (channel(g) << 8) | channel(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_clamps_out_of_range_channels() {
        assert_eq!(pack_color(2.0, -1.0, 0.0, 1.0), 0xFFFF0000);
    }

    #[test]
    fn test_argb_round_trip_of_opaque_color() {
        let color = 0xFF3366CC;
        assert_eq!(Rgba::from_argb(color).to_argb(), color);
    }

    #[test]
    fn test_scale_rgb_keeps_alpha() {
        let c = Rgba::new(0.5, 0.5, 0.5, 0.25).scale_rgb(2.0);
        assert_eq!(c, Rgba::new(1.0, 1.0, 1.0, 0.25));
    }
}
