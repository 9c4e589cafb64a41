//! Tile map and tile decoding
//!
//! Lookups the fetcher and OAM search make against VRAM and OAM.

use crate::common::{bit, Byte, Word};
use crate::lcd::{LcdControl, LCDC_ADDRESS};
use crate::memory::{MemoryBus, OAM_START};

/// Number of entries in OAM
pub const OAM_ENTRIES: usize = 40;

/// Hardware limit of sprites per scanline
pub const MAX_SPRITES_PER_LINE: usize = 10;

/// Bytes per 8x8 tile (2 bitplanes x 8 rows)
pub const TILE_BYTES: usize = 16;

/// OAM Entry (sprite attributes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OamEntry {
    /// Y position (minus 16)
    pub y: Byte,
    /// X position (minus 8)
    pub x: Byte,
    /// Tile index
    pub tile: Byte,
    /// Flags (priority, flip, palette)
    pub flags: Byte,
}

impl OamEntry {
    /// X flip (bit 5)
    pub fn x_flip(&self) -> bool {
        bit(self.flags, 5)
    }

    /// Y flip (bit 6)
    pub fn y_flip(&self) -> bool {
        bit(self.flags, 6)
    }

    /// BG/Window over OBJ priority (bit 7)
    pub fn bg_priority(&self) -> bool {
        bit(self.flags, 7)
    }

    /// Whether the sprite covers scanline `row` at the given height
    pub fn covers_row(&self, row: usize, sprite_height: u8) -> bool {
        let top = self.y as i32 - 16;
        let row = row as i32;
        row >= top && row < top + sprite_height as i32
    }
}

/// One decoded 8x8 tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tile {
    data: [Byte; TILE_BYTES],
}

impl Tile {
    pub fn new(data: [Byte; TILE_BYTES]) -> Self {
        Self { data }
    }

    /// The eight 2-bit color ids of one row, leftmost pixel first
    pub fn row_pixels(&self, row: usize) -> [Byte; 8] {
        let row = row % 8;
        let lo = self.data[row * 2];
        let hi = self.data[row * 2 + 1];

        let mut pixels = [0; 8];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            let shift = 7 - i;
            *pixel = ((hi >> shift) & 1) << 1 | ((lo >> shift) & 1);
        }
        pixels
    }
}

/// Background tile map and OAM lookups
#[derive(Debug, Clone)]
pub struct BgTileMap {
    /// Sprites on current line (max 10), ordered by X
    visible_sprites: Vec<OamEntry>,
    /// Sprite height used by the last OAM search
    sprite_height: u8,
}

impl Default for BgTileMap {
    fn default() -> Self {
        Self::new()
    }
}

impl BgTileMap {
    pub fn new() -> Self {
        Self {
            visible_sprites: Vec::with_capacity(MAX_SPRITES_PER_LINE),
            sprite_height: 8,
        }
    }

    /// Base address of the background tile map (LCDC bit 3)
    pub fn background_tile_map_base<M: MemoryBus + ?Sized>(&self, mem: &M) -> Word {
        LcdControl::from_bits_retain(mem.read(LCDC_ADDRESS)).bg_tile_map()
    }

    /// Tile index stored in the tile map at `address`
    pub fn tile_number_at<M: MemoryBus + ?Sized>(&self, mem: &M, address: Word) -> Byte {
        mem.read(address)
    }

    /// Tile data for a tile index, honoring the LCDC bit 4 addressing mode
    pub fn tile_for<M: MemoryBus + ?Sized>(&self, mem: &M, index: Byte) -> Tile {
        let lcdc = LcdControl::from_bits_retain(mem.read(LCDC_ADDRESS));
        let base = if lcdc.unsigned_tile_data() {
            0x8000 + index as Word * TILE_BYTES as Word
        } else {
            // Signed addressing (0x8800 base, tile 0 at 0x9000)
            (0x9000i32 + index as i8 as i32 * TILE_BYTES as i32) as Word
        };

        let mut data = [0; TILE_BYTES];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = mem.read(base + i as Word);
        }
        Tile::new(data)
    }

    /// Scan OAM for sprites on scanline `row`
    pub fn find_visible_sprites<M: MemoryBus + ?Sized>(&mut self, mem: &M, row: usize, sprite_height: u8) {
        self.visible_sprites.clear();
        self.sprite_height = sprite_height;

        for i in 0..OAM_ENTRIES {
            if self.visible_sprites.len() >= MAX_SPRITES_PER_LINE {
                break;
            }

            let entry = oam_entry(mem, i);
            if entry.covers_row(row, sprite_height) {
                self.visible_sprites.push(entry);
            }
        }

        // Lower X wins; stable sort keeps OAM order for ties
        self.visible_sprites.sort_by_key(|entry| entry.x);
    }

    pub fn visible_sprites(&self) -> &[OamEntry] {
        &self.visible_sprites
    }

    pub fn sprite_height(&self) -> u8 {
        self.sprite_height
    }
}

fn oam_entry<M: MemoryBus + ?Sized>(mem: &M, index: usize) -> OamEntry {
    let offset = OAM_START + (index * 4) as Word;
    OamEntry {
        y: mem.read(offset),
        x: mem.read(offset + 1),
        tile: mem.read(offset + 2),
        flags: mem.read(offset + 3),
    }
}
