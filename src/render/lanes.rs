//! Fixed-width pixel batches.
//!
//! The rasterizer walks each scanline [`LANES`] pixels at a time. Arithmetic
//! on a batch goes through [`F32s`], and which pixels of the batch are still
//! alive (inside the triangle, nearer than the stored depth, not transparent)
//! is tracked in a [`Mask`]. Plain arrays and loops keep this portable; the
//! compiler vectorizes the element-wise operations.

use std::ops::{Add, BitAnd, BitOr, Mul, Not, Sub};

/// Pixels processed together.
pub const LANES: usize = 8;

/// One bit per lane; bit `i` set means lane `i` is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mask(u32);

impl Mask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self((1 << LANES) - 1);

    /// The first `count` lanes (all lanes when `count >= LANES`).
    #[inline]
    pub fn first(count: usize) -> Self {
        if count >= LANES {
            Self::ALL
        } else {
            Self((1 << count) - 1)
        }
    }

    #[inline]
    pub fn from_fn(f: impl Fn(usize) -> bool) -> Self {
        let mut bits = 0;
        for lane in 0..LANES {
            if f(lane) {
                bits |= 1 << lane;
            }
        }
        Self(bits)
    }

    #[inline]
    pub fn test(self, lane: usize) -> bool {
        self.0 & (1 << lane) != 0
    }

    #[inline]
    pub fn clear(&mut self, lane: usize) {
        self.0 &= !(1 << lane);
    }

    #[inline]
    pub fn any(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Indices of the active lanes, ascending.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..LANES).filter(move |&lane| self.test(lane))
    }
}

impl BitAnd for Mask {
    type Output = Mask;

    fn bitand(self, rhs: Mask) -> Mask {
        Mask(self.0 & rhs.0)
    }
}

impl BitOr for Mask {
    type Output = Mask;

    fn bitor(self, rhs: Mask) -> Mask {
        Mask(self.0 | rhs.0)
    }
}

impl Not for Mask {
    type Output = Mask;

    fn not(self) -> Mask {
        Mask(!self.0 & Self::ALL.0)
    }
}

/// A batch of `f32`, one per lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct F32s(pub [f32; LANES]);

impl F32s {
    #[inline]
    pub fn splat(value: f32) -> Self {
        Self([value; LANES])
    }

    /// `start, start + step, start + 2 * step, ...`
    #[inline]
    pub fn ramp(start: f32, step: f32) -> Self {
        Self(std::array::from_fn(|lane| start + lane as f32 * step))
    }

    #[inline]
    pub fn lane(self, lane: usize) -> f32 {
        self.0[lane]
    }

    #[inline]
    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self(self.0.map(f))
    }

    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self(std::array::from_fn(|lane| self.0[lane].min(other.0[lane])))
    }

    /// Lanes where `self >= other`.
    #[inline]
    pub fn ge(self, other: Self) -> Mask {
        Mask::from_fn(|lane| self.0[lane] >= other.0[lane])
    }

    /// Lanes where `self < other`.
    #[inline]
    pub fn lt(self, other: Self) -> Mask {
        Mask::from_fn(|lane| self.0[lane] < other.0[lane])
    }
}

macro_rules! lanewise_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for F32s {
            type Output = F32s;

            #[inline]
            fn $method(self, rhs: F32s) -> F32s {
                F32s(std::array::from_fn(|lane| self.0[lane] $op rhs.0[lane]))
            }
        }

        impl $trait<f32> for F32s {
            type Output = F32s;

            #[inline]
            fn $method(self, rhs: f32) -> F32s {
                F32s(self.0.map(|value| value $op rhs))
            }
        }
    };
}

lanewise_op!(Add, add, +);
lanewise_op!(Sub, sub, -);
lanewise_op!(Mul, mul, *);
