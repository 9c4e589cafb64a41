//! Background tile fetcher
//!
//! Fetches one 8-pixel row of background tile data per column step. Each
//! micro-step costs `FETCHER_FREQUENCY` calls to `process`, so a full
//! fetch takes three times that.

use crate::common::{Byte, Word};
use crate::lcd::{LcdScreen, BGP_ADDRESS, SCX_ADDRESS, SCY_ADDRESS};
use crate::memory::MemoryBus;
use crate::ppu::pipeline::Pixel;
use crate::ppu::tiles::{BgTileMap, Tile};

/// Calls to `process` per fetch micro-step
pub const FETCHER_FREQUENCY: u32 = 2;

/// Tiles per tile map row/column
const TILE_MAP_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherState {
    ReadTileNum,
    ReadData0,
    ReadData1,
    /// Row fetched; held until the FIFO takes it
    TransferReady,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    state: FetcherState,
    /// Horizontal position in pixels, advanced by 8 per tile
    tile_cursor: usize,
    accumulator: u32,
    tile_number: Byte,
    tile: Tile,
    pixels: Vec<Pixel>,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            state: FetcherState::ReadTileNum,
            tile_cursor: 0,
            accumulator: 0,
            tile_number: 0,
            tile: Tile::default(),
            pixels: Vec::with_capacity(8),
        }
    }

    pub fn state(&self) -> FetcherState {
        self.state
    }

    pub fn tile_cursor(&self) -> usize {
        self.tile_cursor
    }

    /// Advance by one external step.
    ///
    /// No-op while a fetched row is waiting in `TransferReady`.
    pub fn process<M: MemoryBus + ?Sized>(&mut self, mem: &M, tiles: &BgTileMap, screen: &LcdScreen) {
        if self.state == FetcherState::TransferReady {
            return;
        }

        self.accumulator += 1;
        if self.accumulator >= FETCHER_FREQUENCY {
            self.accumulator -= FETCHER_FREQUENCY;
            self.fetch(mem, tiles, screen);
        }
    }

    fn fetch<M: MemoryBus + ?Sized>(&mut self, mem: &M, tiles: &BgTileMap, screen: &LcdScreen) {
        match self.state {
            FetcherState::ReadTileNum => {
                let address = self.tile_map_address(mem, tiles, screen);
                self.tile_cursor += 8;
                self.tile_number = tiles.tile_number_at(mem, address);
                self.state = FetcherState::ReadData0;
            }
            FetcherState::ReadData0 => {
                self.tile = tiles.tile_for(mem, self.tile_number);
                self.state = FetcherState::ReadData1;
            }
            FetcherState::ReadData1 => {
                let bgp = mem.read(BGP_ADDRESS);
                self.pixels.clear();
                self.pixels.extend(
                    self.tile
                        .row_pixels(screen.y % 8)
                        .iter()
                        .map(|&color_id| Pixel::from_palette(color_id, bgp)),
                );
                self.state = FetcherState::TransferReady;
            }
            FetcherState::TransferReady => {
                debug_assert!(false, "fetch step taken while a row is waiting");
            }
        }
    }

    /// Tile map address for the current column.
    ///
    /// SCX and SCY are reduced modulo the screen size and added to the tile
    /// column and tile row as tile counts, not pixels. Both sums wrap in the
    /// 32×32 map so the address stays inside the selected map.
    fn tile_map_address<M: MemoryBus + ?Sized>(&self, mem: &M, tiles: &BgTileMap, screen: &LcdScreen) -> Word {
        let scx = mem.read(SCX_ADDRESS) as usize % screen.width();
        let scy = mem.read(SCY_ADDRESS) as usize % screen.height();

        let map_row = (screen.y / 8 + scy) % TILE_MAP_SIZE;
        let map_col = (self.tile_cursor / 8 + scx) % TILE_MAP_SIZE;

        tiles.background_tile_map_base(mem) + (map_row * TILE_MAP_SIZE + map_col) as Word
    }

    /// Hand the fetched row over and start on the next column.
    ///
    /// Returns an empty row unless the fetcher is in `TransferReady`.
    pub fn take_row(&mut self) -> Vec<Pixel> {
        if self.state != FetcherState::TransferReady {
            return Vec::new();
        }
        self.state = FetcherState::ReadTileNum;
        std::mem::replace(&mut self.pixels, Vec::with_capacity(8))
    }

    /// Start of scanline: back to the first column
    pub fn reset(&mut self) {
        self.state = FetcherState::ReadTileNum;
        self.tile_cursor = 0;
        self.accumulator = 0;
        self.pixels.clear();
    }
}
