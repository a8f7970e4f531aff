//! Metric units: three dimensions and three scales packed into one
//! 32-bit word on disk.
//!
//! Wire layout (big-endian word):
//! ```text
//! Bits    Field
//! 31..28  dim_space   (signed nibble)
//! 27..24  dim_time    (signed nibble)
//! 23..20  dim_count   (signed nibble)
//! 19..16  scale_space (unsigned nibble)
//! 15..12  scale_time  (unsigned nibble)
//! 11..8   scale_count (signed nibble)
//! 7..0    zero
//! ```

use serde::{Deserialize, Serialize};

/// Dimension and scale of a metric's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    pub dim_space: i8,
    pub dim_time: i8,
    pub dim_count: i8,
    pub scale_space: u8,
    pub scale_time: u8,
    pub scale_count: i8,
}

/// Sign-extend a 4-bit two's-complement nibble.
fn sext4(nibble: u32) -> i8 {
    if nibble & 0x8 != 0 {
        (nibble | 0xffff_fff0) as i8
    } else {
        nibble as i8
    }
}

impl Units {
    pub fn new(
        dim_space: i8,
        dim_time: i8,
        dim_count: i8,
        scale_space: u8,
        scale_time: u8,
        scale_count: i8,
    ) -> Self {
        Self {
            dim_space,
            dim_time,
            dim_count,
            scale_space,
            scale_time,
            scale_count,
        }
    }

    /// Pack into the on-disk word. Fields are truncated to their
    /// nibble width.
    pub fn pack(&self) -> u32 {
        ((self.dim_space as u32 & 0xf) << 28)
            | ((self.dim_time as u32 & 0xf) << 24)
            | ((self.dim_count as u32 & 0xf) << 20)
            | ((self.scale_space as u32 & 0xf) << 16)
            | ((self.scale_time as u32 & 0xf) << 12)
            | ((self.scale_count as u32 & 0xf) << 8)
    }

    /// Unpack from the on-disk word.
    pub fn unpack(word: u32) -> Self {
        Self {
            dim_space: sext4((word >> 28) & 0xf),
            dim_time: sext4((word >> 24) & 0xf),
            dim_count: sext4((word >> 20) & 0xf),
            scale_space: ((word >> 16) & 0xf) as u8,
            scale_time: ((word >> 12) & 0xf) as u8,
            scale_count: sext4((word >> 8) & 0xf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_roundtrip() {
        let u = Units::new(1, -1, 0, 3, 2, -2);
        assert_eq!(Units::unpack(u.pack()), u);
    }

    #[test]
    fn test_zero_units() {
        let u = Units::default();
        assert_eq!(u.pack(), 0);
        assert_eq!(Units::unpack(0), u);
    }

    #[test]
    fn test_negative_dimensions() {
        // bytes / second: dim_space=1, dim_time=-1
        let u = Units::new(1, -1, 0, 0, 0, 0);
        let word = u.pack();
        assert_eq!((word >> 28) & 0xf, 0x1);
        assert_eq!((word >> 24) & 0xf, 0xf); // -1 as a nibble
        assert_eq!(Units::unpack(word), u);
    }

    #[test]
    fn test_low_byte_always_zero() {
        let u = Units::new(-8, 7, -1, 15, 15, -8);
        assert_eq!(u.pack() & 0xff, 0);
        assert_eq!(Units::unpack(u.pack()), u);
    }
}
