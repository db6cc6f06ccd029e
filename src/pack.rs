//! Square-texture layout and 2D index packing.
//!
//! Scene buffers are logically 1D but get uploaded as square 2D textures.
//! A buffer of `count` elements is laid out in a `width x width` texture
//! with `width = floor(sqrt(count)) + 1`; the tail is zero padding.
//!
//! An offset `o` into such a buffer is packed into one `u32` as
//! `(col << 12) | row` with `row = o / width` and `col = o % width`, which a
//! shader splits back into texel coordinates. Both fields are 12 bits wide,
//! so a packed buffer can be at most 4096 texels on a side.

use bytemuck::Zeroable;

use crate::util::{Error, Result};

/// Bits per packed coordinate field.
pub const PACKED_FIELD_BITS: u32 = 12;

/// Largest square width a packed index can address.
pub const MAX_PACKED_WIDTH: usize = 1 << PACKED_FIELD_BITS;

const FIELD_MASK: u32 = (1 << PACKED_FIELD_BITS) - 1;

/// `floor(sqrt(count)) + 1`.
pub fn square_width(count: usize) -> usize {
    let mut w = (count as f64).sqrt() as usize;
    while w * w > count {
        w -= 1;
    }
    while (w + 1) * (w + 1) <= count {
        w += 1;
    }
    w + 1
}

/// Square texture layout of one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareLayout {
    /// Number of meaningful elements
    pub count: usize,
    /// Texture side length
    pub width: usize,
}

impl SquareLayout {
    /// Layout for `count` elements, checked against `max_width`.
    pub fn new(buffer: &'static str, count: usize, max_width: usize) -> Result<Self> {
        let width = square_width(count);
        if width > max_width.min(MAX_PACKED_WIDTH) {
            return Err(Error::TextureWidthOverflow {
                buffer,
                width,
                max: max_width.min(MAX_PACKED_WIDTH),
            });
        }
        Ok(Self { count, width })
    }

    /// `width * width`.
    #[inline]
    pub fn padded_len(&self) -> usize {
        self.width * self.width
    }

    /// Resize `buf` to the padded length, zero-filling the tail.
    pub fn pad<T: Zeroable + Clone>(&self, buf: &mut Vec<T>) {
        debug_assert_eq!(buf.len(), self.count);
        buf.resize(self.padded_len(), T::zeroed());
    }

    /// Pack an offset into this buffer.
    #[inline]
    pub fn pack(&self, offset: u32) -> u32 {
        pack_index(offset, self.width)
    }
}

/// Pack `offset` for a buffer of square side `width`.
///
/// `width` must not exceed [`MAX_PACKED_WIDTH`]; [`SquareLayout::new`] is
/// where that gets enforced.
#[inline]
pub fn pack_index(offset: u32, width: usize) -> u32 {
    debug_assert!(width > 0 && width <= MAX_PACKED_WIDTH);
    let w = width as u32;
    debug_assert!(offset < w * w, "offset {offset} outside {width}x{width} texture");
    let row = offset / w;
    let col = offset % w;
    (col << PACKED_FIELD_BITS) | row
}

/// Inverse of [`pack_index`].
#[inline]
pub fn unpack_index(packed: u32, width: usize) -> u32 {
    let row = packed & FIELD_MASK;
    let col = packed >> PACKED_FIELD_BITS;
    row * width as u32 + col
}
