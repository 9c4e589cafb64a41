//! Common types and utilities for the PPU core
//!
//! This module defines type aliases matching Game Boy hardware specifications
//! and provides bit manipulation utilities.

/// 8-bit unsigned integer (Game Boy byte)
pub type Byte = u8;

/// 16-bit unsigned integer (Game Boy word)
pub type Word = u16;

/// Check if a specific bit is set in a byte value
///
/// # Arguments
/// * `value` - The byte value to check
/// * `n` - The bit position (0-7)
///
/// # Returns
/// `true` if the bit at position `n` is set, `false` otherwise
#[inline]
pub fn bit(value: Byte, n: u8) -> bool {
    (value & (1 << n)) != 0
}

/// Set or clear a specific bit in a byte value
///
/// # Arguments
/// * `value` - Mutable reference to the byte value
/// * `n` - The bit position (0-7)
/// * `on` - `true` to set the bit, `false` to clear it
#[inline]
pub fn bit_set(value: &mut Byte, n: u8, on: bool) {
    if on {
        *value |= 1 << n;
    } else {
        *value &= !(1 << n);
    }
}

/// OR a raw mask into a byte value.
///
/// Used where the hardware latch is described by a mask rather than a bit
/// position (the STAT latches written at HBLANK/VBLANK).
#[inline]
pub fn set_bit_mask(value: Byte, mask: Byte) -> Byte {
    value | mask
}
