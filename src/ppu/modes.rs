//! PPU Modes
//!
//! Mode enumeration and the fixed per-mode cycle budgets.
//!
//! - OAM Search (mode 2): 80 T-cycles
//! - Pixel Transfer (mode 3): 172 T-cycles nominal
//! - HBlank (mode 0): 204 T-cycles
//! - VBlank (mode 1): 456 T-cycles per scanline

use std::fmt;

pub const OAM_SEARCH_CYCLES: u32 = 80;
pub const PIXEL_TRANSFER_CYCLES: u32 = 172;
pub const HBLANK_CYCLES: u32 = 204;
pub const VBLANK_CYCLES: u32 = 456;

/// T-cycles in one scanline
pub const CYCLES_PER_LINE: u32 = OAM_SEARCH_CYCLES + PIXEL_TRANSFER_CYCLES + HBLANK_CYCLES;

/// Scanlines spent in VBlank past the visible area
pub const VBLANK_LINES: u32 = 10;

/// PPU modes, discriminants matching STAT bits 0-1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpuMode {
    HBlank = 0,
    VBlank = 1,
    OamSearch = 2,
    PixelTransfer = 3,
}

impl PpuMode {
    /// Cycles the mode lasts before the controller moves on
    pub fn budget(self) -> u32 {
        match self {
            PpuMode::OamSearch => OAM_SEARCH_CYCLES,
            PpuMode::PixelTransfer => PIXEL_TRANSFER_CYCLES,
            PpuMode::HBlank => HBLANK_CYCLES,
            PpuMode::VBlank => VBLANK_CYCLES,
        }
    }

    /// STAT mode bits
    pub fn stat_bits(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PpuMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PpuMode::OamSearch => write!(f, "OAM search"),
            PpuMode::PixelTransfer => write!(f, "pixel transfer"),
            PpuMode::HBlank => write!(f, "HBlank"),
            PpuMode::VBlank => write!(f, "VBlank"),
        }
    }
}

/// Total T-cycles in one frame for a screen of `visible_rows` lines
pub fn frame_cycles(visible_rows: u32) -> u32 {
    visible_rows * CYCLES_PER_LINE + VBLANK_LINES * VBLANK_CYCLES
}
