//! Texture sampling.
//!
//! The rasterizer only sees the [`TextureSource`] trait. [`Texture`] and
//! [`TextureAtlas`] are a simple in-memory implementation backed by the
//! `image` crate for loading.

use std::path::Path;

use thiserror::Error;

use crate::colors::Rgba;
use crate::geometry::TextureIndex;

/// Color returned for indices the atlas does not know.
pub const MISSING_TEXTURE_COLOR: Rgba = Rgba::rgb(1.0, 0.0, 1.0);

/// Read-only color lookup shared by all render workers.
pub trait TextureSource: Sync {
    /// Samples texture `index` at texel coordinates `(u, v)`, wrapping around
    /// both axes.
    fn sample(&self, index: TextureIndex, u: f32, v: f32) -> Rgba;

    /// True when no texel of the texture is transparent, so the rasterizer can
    /// skip the alpha test.
    fn is_opaque_only(&self, index: TextureIndex) -> bool;
}

/// Things that can go wrong when building textures.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load texture image")]
    Image(#[from] image::ImageError),

    #[error("texture must be at least 1x1, got {width}x{height}")]
    Empty { width: u32, height: u32 },

    #[error("expected {expected} texels for the given size, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Represents a 2D texture for texture mapping.
#[derive(Debug, Clone)]
pub struct Texture {
    data: Vec<u32>, // ARGB8888 texels, row-major
    width: u32,
    height: u32,
    opaque: bool,
}

impl Texture {
    /// Load a texture from an image file (PNG, JPG, etc.)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();

        let data: Vec<u32> = img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
            })
            .collect();

        Self::from_argb(width, height, data)
    }

    /// Wraps raw ARGB8888 texels.
    pub fn from_argb(width: u32, height: u32, data: Vec<u32>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let opaque = data.iter().all(|&texel| texel >> 24 != 0);
        Ok(Self {
            data,
            width,
            height,
            opaque,
        })
    }

    /// A two-color checkerboard of `size`x`size` texels with `cell`-sized squares.
    pub fn checkerboard(size: u32, cell: u32, a: u32, b: u32) -> Self {
        let size = size.max(1);
        let cell = cell.max(1);
        let data = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                if (x / cell + y / cell) % 2 == 0 {
                    a
                } else {
                    b
                }
            })
            .collect();
        Self {
            opaque: a >> 24 != 0 && b >> 24 != 0,
            data,
            width: size,
            height: size,
        }
    }

    /// Nearest texel at texel coordinates `(u, v)` with wrap-around addressing.
    ///
    /// Coordinates are reduced modulo the texture size into the positive
    /// range, so negative coordinates wrap too.
    #[inline]
    pub fn texel(&self, u: f32, v: f32) -> u32 {
        let x = (u.floor() as i64).rem_euclid(self.width as i64) as u32;
        let y = (v.floor() as i64).rem_euclid(self.height as i64) as u32;
        self.data[(y * self.width + x) as usize]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when every texel has a non-zero alpha.
    pub fn is_opaque(&self) -> bool {
        self.opaque
    }
}

/// Indexed collection of textures.
#[derive(Debug, Clone, Default)]
pub struct TextureAtlas {
    textures: Vec<Texture>,
}

impl TextureAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a texture and returns its index.
    pub fn add(&mut self, texture: Texture) -> TextureIndex {
        self.textures.push(texture);
        TextureIndex((self.textures.len() - 1) as u32)
    }

    pub fn get(&self, index: TextureIndex) -> Option<&Texture> {
        self.textures.get(index.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl TextureSource for TextureAtlas {
    #[inline]
    fn sample(&self, index: TextureIndex, u: f32, v: f32) -> Rgba {
        match self.get(index) {
            Some(texture) => Rgba::from_argb(texture.texel(u, v)),
            None => MISSING_TEXTURE_COLOR,
        }
    }

    fn is_opaque_only(&self, index: TextureIndex) -> bool {
        self.get(index).map_or(true, Texture::is_opaque)
    }
}
