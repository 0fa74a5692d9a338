//! Downsampling the internal color buffer into the packed output frame.
//!
//! With supersampling the color buffer is `ssaa` times larger than the output
//! on both axes; every output pixel averages its `ssaa * ssaa` block. The
//! average is optionally dithered with a 4x4 ordered (Bayer) pattern before it
//! is quantized to ARGB8888. The output is always fully opaque.

use std::ops::Range;

use super::buffer::BufferRows;
use crate::colors::{pack_color, Rgba};

const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Offset added to a channel before quantization, in `(-0.5, 0.5)` steps of
/// one 8-bit level.
#[inline]
pub fn dither_offset(x: usize, y: usize) -> f32 {
    ((BAYER_4X4[y % 4][x % 4] as f32 + 0.5) / 16.0 - 0.5) / 255.0
}

/// Resolves output rows `rows` into `out`, which holds exactly those rows.
///
/// `color` must hold internal rows `rows.start * ssaa .. rows.end * ssaa`.
pub fn resolve_rows(
    color: &BufferRows<'_, Rgba>,
    out: &mut [u32],
    rows: Range<usize>,
    width: usize,
    ssaa: usize,
    dither: bool,
) {
    let ssaa = ssaa.max(1);
    let weight = 1.0 / (ssaa * ssaa) as f32;

    for (y, out_row) in rows.zip(out.chunks_exact_mut(width)) {
        for (x, pixel) in out_row.iter_mut().enumerate() {
            let mut sum = Rgba::ZERO;
            for sy in y * ssaa..(y + 1) * ssaa {
                let row = color.row(sy);
                for sample in &row[x * ssaa..(x + 1) * ssaa] {
                    sum = sum + *sample;
                }
            }
            let c = sum * weight;
            let offset = if dither { dither_offset(x, y) } else { 0.0 };
            *pixel = pack_color(c.r + offset, c.g + offset, c.b + offset, 1.0);
        }
    }
}
