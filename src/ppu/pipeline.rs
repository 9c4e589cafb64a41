//! Pixel Pipeline
//!
//! This module implements the pixel FIFO that drains fetched rows onto
//! the screen, one pixel per cycle.

use std::collections::VecDeque;
use std::num::NonZeroU32;

use crate::common::Byte;
use crate::lcd::LcdScreen;
use crate::ppu::fetcher::Fetcher;

/// Cost of pushing a pixel or of stalling on an empty FIFO
const STEP_CYCLES: NonZeroU32 = NonZeroU32::MIN;

/// One background pixel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pixel {
    /// Raw 2-bit color id from tile data
    pub color_id: Byte,
    /// Shade after the palette is applied
    pub shade: Byte,
}

impl Pixel {
    /// Map a color id through a BGP-style palette byte
    pub fn from_palette(color_id: Byte, palette: Byte) -> Self {
        Self {
            color_id,
            shade: (palette >> (color_id * 2)) & 0x03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFifoState {
    /// Empty and ready to take a row
    Idle,
    Pushing,
}

#[derive(Debug, Clone)]
pub struct PixelFifo {
    state: PixelFifoState,
    pixels: VecDeque<Pixel>,
}

impl Default for PixelFifo {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelFifo {
    pub fn new() -> Self {
        Self {
            state: PixelFifoState::Idle,
            pixels: VecDeque::with_capacity(16),
        }
    }

    pub fn state(&self) -> PixelFifoState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == PixelFifoState::Idle
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Push at most one pixel to the screen.
    ///
    /// Returns the cycles spent. The cost is never zero: the transfer loop
    /// counts down on it.
    pub fn process(&mut self, screen: &mut LcdScreen) -> NonZeroU32 {
        match self.state {
            PixelFifoState::Idle => STEP_CYCLES,
            PixelFifoState::Pushing => {
                if let Some(pixel) = self.pixels.pop_front() {
                    screen.put_pixel(pixel.shade);
                    screen.x += 1;
                }
                if self.pixels.is_empty() {
                    self.state = PixelFifoState::Idle;
                }
                STEP_CYCLES
            }
        }
    }

    /// Take the fetcher's row; the fetcher moves on to the next column
    pub fn load(&mut self, fetcher: &mut Fetcher) {
        self.pixels.extend(fetcher.take_row());
        if !self.pixels.is_empty() {
            self.state = PixelFifoState::Pushing;
        }
    }

    pub fn reset(&mut self) {
        self.pixels.clear();
        self.state = PixelFifoState::Idle;
    }
}
