//! Dense per-pixel buffers.
//!
//! Every buffer is a row-major `width * height` array. Workers never share a
//! buffer directly: [`Buffer2D::bands_mut`] splits it into disjoint
//! [`BufferRows`] views, one per scanline band, so writes need no locking.

use std::ops::Range;

use super::lanes::{Mask, LANES};
use crate::colors::Rgba;
use crate::math::Vec4;

/// Depth buffer clear value. Larger than any reciprocal depth a visible
/// fragment can produce (those are all negative).
pub const DEPTH_CLEAR: f32 = f32::INFINITY;

/// Reciprocal camera-space depth per pixel.
pub type DepthBuffer = Buffer2D<f32>;
/// Shaded color per pixel.
pub type ColorBuffer = Buffer2D<Rgba>;
/// World-space position of the visible surface per pixel.
pub type WorldBuffer = Buffer2D<Vec4>;

#[derive(Debug, Clone)]
pub struct Buffer2D<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Copy> Buffer2D<T> {
    pub fn new(width: usize, height: usize, value: T) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reallocates for new dimensions, filling with `value`.
    pub fn resize(&mut self, width: usize, height: usize, value: T) {
        self.data.clear();
        self.data.resize(width * height, value);
        self.width = width;
        self.height = height;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Value at (x, y), or None if out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        (x < self.width && y < self.height).then(|| self.data[y * self.width + x])
    }

    /// Silently ignores out-of-bounds coordinates.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    pub fn row(&self, y: usize) -> &[T] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Gathers [`LANES`] consecutive pixels starting at (x, y); lanes past the
    /// end of the row read `fallback`.
    #[inline]
    pub fn load_lanes(&self, x: usize, y: usize, fallback: T) -> [T; LANES] {
        load_row_lanes(self.row(y), x, fallback)
    }

    /// Splits the buffer into disjoint row views.
    ///
    /// # Panics
    /// Panics if the ranges are not ascending, non-overlapping and inside the
    /// buffer.
    pub fn bands_mut(&mut self, bands: &[Range<usize>]) -> Vec<BufferRows<'_, T>> {
        let (width, height) = (self.width, self.height);
        let mut rest: &mut [T] = &mut self.data;
        let mut consumed = 0;
        let mut views = Vec::with_capacity(bands.len());

        for band in bands {
            assert!(
                band.start >= consumed && band.start <= band.end && band.end <= height,
                "band {band:?} overlaps a previous band or leaves the {height}-row buffer"
            );
            let (_, tail) = std::mem::take(&mut rest).split_at_mut((band.start - consumed) * width);
            let (rows, tail) = tail.split_at_mut(band.len() * width);
            rest = tail;
            consumed = band.end;
            views.push(BufferRows {
                data: rows,
                width,
                rows: band.clone(),
            });
        }
        views
    }
}

/// Mutable view of the rows `rows` of a [`Buffer2D`]. Coordinates passed to
/// its methods are in whole-buffer space.
#[derive(Debug)]
pub struct BufferRows<'a, T> {
    data: &'a mut [T],
    width: usize,
    rows: Range<usize>,
}

impl<T: Copy> BufferRows<'_, T> {
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        (x < self.width && self.rows.contains(&y))
            .then(|| self.data[(y - self.rows.start) * self.width + x])
    }

    /// The whole row `y`. `y` must lie inside the view.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = (y - self.rows.start) * self.width;
        &self.data[start..start + self.width]
    }

    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = (y - self.rows.start) * self.width;
        &mut self.data[start..start + self.width]
    }

    /// See [`Buffer2D::load_lanes`].
    #[inline]
    pub fn load_lanes(&self, x: usize, y: usize, fallback: T) -> [T; LANES] {
        load_row_lanes(self.row(y), x, fallback)
    }

    /// Scatters the active lanes of `values` to consecutive pixels starting
    /// at (x, y). Lanes past the end of the row are dropped.
    #[inline]
    pub fn store_lanes(&mut self, x: usize, y: usize, values: &[T; LANES], mask: Mask) {
        let row = self.row_mut(y);
        for lane in mask.iter() {
            if let Some(pixel) = row.get_mut(x + lane) {
                *pixel = values[lane];
            }
        }
    }
}

#[inline]
fn load_row_lanes<T: Copy>(row: &[T], x: usize, fallback: T) -> [T; LANES] {
    std::array::from_fn(|lane| row.get(x + lane).copied().unwrap_or(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_bounds() {
        let mut buffer = Buffer2D::new(4, 3, 0u32);
        buffer.set(3, 2, 7);
        buffer.set(4, 0, 9);
        assert_eq!(buffer.get(3, 2), Some(7));
        assert_eq!(buffer.get(4, 0), None);
        assert_eq!(buffer.as_slice().iter().sum::<u32>(), 7);
    }

    #[test]
    fn test_bands_are_disjoint_views_in_buffer_coordinates() {
        let mut buffer = Buffer2D::new(3, 6, 0usize);
        {
            let mut bands = buffer.bands_mut(&[0..2, 2..5, 5..6]);
            for (index, band) in bands.iter_mut().enumerate() {
                band.fill(index + 1);
            }
            assert_eq!(bands[1].rows(), 2..5);
            assert_eq!(bands[1].get(0, 4), Some(2));
            assert_eq!(bands[1].get(0, 5), None);
        }
        let rows: Vec<usize> = (0..6).map(|y| buffer.row(y)[0]).collect();
        assert_eq!(rows, vec![1, 1, 2, 2, 2, 3]);
    }

    #[test]
    fn test_bands_may_skip_rows() {
        let mut buffer = Buffer2D::new(2, 4, 0u8);
        let mut bands = buffer.bands_mut(&[1..2, 3..4]);
        bands[0].fill(1);
        bands[1].fill(2);
        drop(bands);
        assert_eq!(buffer.as_slice(), &[0, 0, 1, 1, 0, 0, 2, 2]);
    }

    #[test]
    #[should_panic(expected = "overlaps")]
    fn test_overlapping_bands_panic() {
        let mut buffer = Buffer2D::new(2, 4, 0u8);
        buffer.bands_mut(&[0..3, 2..4]);
    }

    #[test]
    fn test_lane_gather_scatter_respects_mask_and_row_end() {
        let mut buffer = Buffer2D::new(10, 2, 0i32);
        {
            let mut bands = buffer.bands_mut(&[0..2]);
            let values: [i32; LANES] = std::array::from_fn(|lane| lane as i32 + 1);
            let mask = Mask::from_fn(|lane| lane % 2 == 0);
            // Starts at x = 5, so lanes 5.. fall off the row.
            bands[0].store_lanes(5, 1, &values, mask);
        }
        assert_eq!(buffer.row(1), &[0, 0, 0, 0, 0, 1, 0, 3, 0, 5]);
        assert_eq!(buffer.row(0), &[0; 10]);

        let loaded = buffer.load_lanes(5, 1, -1);
        assert_eq!(&loaded[..5], &[1, 0, 3, 0, 5]);
        assert!(loaded[5..].iter().all(|&v| v == -1));
    }
}
