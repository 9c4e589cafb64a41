//! LCD Control
//!
//! This module holds the LCD register addresses, typed views over the
//! LCDC and STAT bytes, and the screen the PPU draws into.
//!
//! LCD Registers:
//! - LCDC (0xFF40): LCD Control
//! - STAT (0xFF41): LCD Status
//! - SCY (0xFF42): Scroll Y
//! - SCX (0xFF43): Scroll X
//! - LY (0xFF44): Current scanline
//! - BGP (0xFF47): Background Palette

use bitflags::bitflags;

use crate::common::{Byte, Word};
use crate::error::{self, Error};

pub const LCDC_ADDRESS: Word = 0xFF40;
pub const STAT_ADDRESS: Word = 0xFF41;
pub const SCY_ADDRESS: Word = 0xFF42;
pub const SCX_ADDRESS: Word = 0xFF43;
pub const LY_ADDRESS: Word = 0xFF44;
pub const BGP_ADDRESS: Word = 0xFF47;

/// Screen dimensions
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

/// Shortest screen that draws a line before entering VBlank
pub const MIN_SCREEN_HEIGHT: usize = 2;

/// Tallest screen whose last VBlank row still fits in LY
pub const MAX_SCREEN_HEIGHT: usize = 246;

bitflags! {
    /// LCD Control register (LCDC)
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LcdControl: u8 {
        const LCD_ENABLE          = 0b1000_0000;
        const WINDOW_TILEMAP      = 0b0100_0000;
        const WINDOW_ENABLE       = 0b0010_0000;
        const BG_WINDOW_TILE_DATA = 0b0001_0000; // 0=8800-97FF (signed), 1=8000-8FFF
        const BG_TILEMAP          = 0b0000_1000; // 0=9800-9BFF, 1=9C00-9FFF
        const SPRITE_SIZE         = 0b0000_0100; // 0=8x8, 1=8x16
        const SPRITE_ENABLE       = 0b0000_0010;
        const BG_WINDOW_ENABLE    = 0b0000_0001;
    }
}

impl LcdControl {
    /// Sprite height selected by bit 2
    pub fn sprite_height(self) -> u8 {
        if self.contains(LcdControl::SPRITE_SIZE) { 16 } else { 8 }
    }

    /// Background tile map base address selected by bit 3
    pub fn bg_tile_map(self) -> Word {
        if self.contains(LcdControl::BG_TILEMAP) { 0x9C00 } else { 0x9800 }
    }

    /// Whether BG tile data uses unsigned 0x8000 addressing (bit 4)
    pub fn unsigned_tile_data(self) -> bool {
        self.contains(LcdControl::BG_WINDOW_TILE_DATA)
    }
}

bitflags! {
    /// LCD Status register (STAT)
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LcdStatus: u8 {
        const LYC_INTERRUPT    = 0b0100_0000;
        const OAM_INTERRUPT    = 0b0010_0000;
        const VBLANK_INTERRUPT = 0b0001_0000;
        const HBLANK_INTERRUPT = 0b0000_1000;
        const LYC_EQUAL_LY     = 0b0000_0100;
        const MODE_MASK        = 0b0000_0011;
    }
}

/// The screen the PPU renders into.
///
/// This is the single render context shared between the mode controller,
/// the fetcher and the pixel FIFO. The PPU owns it and lends it out for
/// the duration of each step; nothing keeps a reference across calls.
#[derive(Debug, Clone)]
pub struct LcdScreen {
    /// Current pixel column
    pub x: usize,
    /// Current scanline row
    pub y: usize,
    /// A complete frame is waiting to be presented
    pub frame_ready: bool,
    width: usize,
    height: usize,
    /// Shades 0-3, row-major
    buffer: Vec<Byte>,
}

impl Default for LcdScreen {
    fn default() -> Self {
        Self::sized(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl LcdScreen {
    /// Create a screen of `width` x `height` pixels.
    ///
    /// LY is 8 bits and counts up to `height + 9` before the frame wraps,
    /// so the height must lie in `MIN_SCREEN_HEIGHT..=MAX_SCREEN_HEIGHT`.
    pub fn new(width: usize, height: usize) -> error::Result<Self> {
        if width == 0 || !(MIN_SCREEN_HEIGHT..=MAX_SCREEN_HEIGHT).contains(&height) {
            return Err(Error::ScreenSize { width, height });
        }
        Ok(Self::sized(width, height))
    }

    fn sized(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            frame_ready: false,
            width,
            height,
            buffer: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Put a shade at the cursor position. Off-screen positions are ignored.
    pub fn put_pixel(&mut self, shade: Byte) {
        if self.x < self.width && self.y < self.height {
            self.buffer[self.y * self.width + self.x] = shade;
        }
    }

    /// Shade at a given position, if on screen
    pub fn pixel(&self, x: usize, y: usize) -> Option<Byte> {
        if x < self.width && y < self.height {
            Some(self.buffer[y * self.width + x])
        } else {
            None
        }
    }

    /// Whole framebuffer
    pub fn buffer(&self) -> &[Byte] {
        &self.buffer
    }

    /// Consume the frame-ready signal
    pub fn take_frame(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcdc_bits() {
        let lcdc = LcdControl::from_bits_retain(0xFF);
        assert_eq!(lcdc.sprite_height(), 16);
        assert_eq!(lcdc.bg_tile_map(), 0x9C00);
        assert!(lcdc.unsigned_tile_data());

        let lcdc = LcdControl::from_bits_retain(0x00);
        assert_eq!(lcdc.sprite_height(), 8);
        assert_eq!(lcdc.bg_tile_map(), 0x9800);
        assert!(!lcdc.unsigned_tile_data());
    }

    #[test]
    fn test_stat_bits() {
        let stat = LcdStatus::from_bits_retain(0x11);
        assert!(stat.contains(LcdStatus::VBLANK_INTERRUPT));
        assert!(!stat.contains(LcdStatus::HBLANK_INTERRUPT));
        assert_eq!((stat & LcdStatus::MODE_MASK).bits(), 1);
    }

    #[test]
    fn test_screen_put_pixel() {
        let mut screen = LcdScreen::default();
        screen.x = 3;
        screen.y = 2;
        screen.put_pixel(2);
        assert_eq!(screen.pixel(3, 2), Some(2));

        // Off-screen writes are dropped
        screen.x = SCREEN_WIDTH;
        screen.put_pixel(3);
        assert_eq!(screen.pixel(SCREEN_WIDTH, 2), None);
        assert!(screen.buffer().iter().all(|&s| s <= 2));
    }

    #[test]
    fn test_screen_size_limits() {
        assert!(LcdScreen::new(160, 0).is_err());
        assert!(LcdScreen::new(160, 1).is_err());
        assert!(LcdScreen::new(160, MIN_SCREEN_HEIGHT).is_ok());
        assert!(LcdScreen::new(0, 144).is_err());
        assert!(LcdScreen::new(160, MAX_SCREEN_HEIGHT + 1).is_err());

        let screen = LcdScreen::new(160, MAX_SCREEN_HEIGHT).unwrap();
        assert_eq!(screen.height(), MAX_SCREEN_HEIGHT);
        // Highest LY written before the wrap
        assert_eq!(MAX_SCREEN_HEIGHT + 9, Byte::MAX as usize);
    }

    #[test]
    fn test_take_frame() {
        let mut screen = LcdScreen::default();
        assert!(!screen.take_frame());
        screen.frame_ready = true;
        assert!(screen.take_frame());
        assert!(!screen.frame_ready);
    }
}
