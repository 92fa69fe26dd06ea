//! Font capability
//!
//! The console never rasterizes text itself. It asks a [`FontProvider`] for
//! metrics and for one-bit glyph bitmaps, and caches what it gets back.
//! [`Font8x8`] is a small built-in provider backed by the `font8x8` tables.

use font8x8::UnicodeFonts;

/// Font identifier
pub type FontId = u32;

/// One-bit-per-pixel bitmap, rows packed MSB first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    stride: usize,
    bits: Vec<u8>,
}

impl Bitmap {
    /// Blank bitmap
    pub fn new(width: u32, height: u32) -> Self {
        let stride = (width as usize + 7) / 8;
        Self {
            width,
            height,
            stride,
            bits: vec![0; stride * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let byte = self.bits[y as usize * self.stride + (x / 8) as usize];
        byte & (0x80 >> (x % 8)) != 0
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let byte = &mut self.bits[y as usize * self.stride + (x / 8) as usize];
        let mask = 0x80 >> (x % 8);
        if on {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Number of set pixels
    pub fn count_ones(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }
}

/// A rendered character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub bitmap: Bitmap,
    /// Horizontal advance in pixels
    pub advance: u32,
}

/// Cell metrics of a font
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub char_width: u32,
    pub line_height: u32,
}

/// Rasterization capability supplied by the host
pub trait FontProvider: Send + Sync {
    /// Width of one character cell, `None` for an unknown font
    fn char_width(&self, font: FontId) -> Option<u32>;

    /// Height of one text line, `None` for an unknown font
    fn line_height(&self, font: FontId) -> Option<u32>;

    /// Rasterize one character; `None` when the font has no glyph for it
    fn render(&self, font: FontId, ch: char) -> Option<Glyph>;

    fn metrics(&self, font: FontId) -> Option<FontMetrics> {
        Some(FontMetrics {
            char_width: self.char_width(font)?,
            line_height: self.line_height(font)?,
        })
    }
}

/// Built-in 8x8 font.
///
/// Font id `n` is the 8x8 table scaled by `n + 1`, up to [`Font8x8::MAX_SCALE`].
/// Characters without a glyph fall back to `?`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Font8x8;

impl Font8x8 {
    pub const MAX_SCALE: u32 = 4;

    fn scale(font: FontId) -> Option<u32> {
        let scale = font.checked_add(1)?;
        (scale <= Self::MAX_SCALE).then_some(scale)
    }

    fn lookup(ch: char) -> Option<[u8; 8]> {
        font8x8::BASIC_FONTS
            .get(ch)
            .or_else(|| font8x8::LATIN_FONTS.get(ch))
            .or_else(|| font8x8::BOX_FONTS.get(ch))
            .or_else(|| font8x8::BLOCK_FONTS.get(ch))
            .or_else(|| font8x8::GREEK_FONTS.get(ch))
            .or_else(|| font8x8::MISC_FONTS.get(ch))
    }
}

impl FontProvider for Font8x8 {
    fn char_width(&self, font: FontId) -> Option<u32> {
        Self::scale(font).map(|s| 8 * s)
    }

    fn line_height(&self, font: FontId) -> Option<u32> {
        Self::scale(font).map(|s| 8 * s)
    }

    fn render(&self, font: FontId, ch: char) -> Option<Glyph> {
        let scale = Self::scale(font)?;
        let rows = Self::lookup(ch).or_else(|| Self::lookup('?'))?;

        let mut bitmap = Bitmap::new(8 * scale, 8 * scale);
        for (y, bits) in rows.iter().enumerate() {
            for x in 0..8u32 {
                // font8x8 stores the leftmost pixel in the LSB
                if (bits >> x) & 1 == 1 {
                    for dy in 0..scale {
                        for dx in 0..scale {
                            bitmap.set(x * scale + dx, y as u32 * scale + dy, true);
                        }
                    }
                }
            }
        }

        Some(Glyph { bitmap, advance: 8 * scale })
    }
}
