//! Memory Bus
//!
//! This module defines the memory contract the PPU core consumes and a flat
//! 64KB implementation of it.
//!
//! The PPU only touches a handful of fixed addresses:
//! - 0x8000-0x9FFF: VRAM (tile data and tile maps)
//! - 0xFE00-0xFE9F: OAM
//! - 0xFF0F: IF register
//! - 0xFF40-0xFF47: LCD registers
//! - 0xFFFF: IE register

use crate::common::{Byte, Word};
use crate::lcd::{BGP_ADDRESS, LCDC_ADDRESS, STAT_ADDRESS};

/// Interrupt Flags register (IF)
pub const IF_ADDRESS: Word = 0xFF0F;

/// Interrupt Enable register (IE)
pub const IE_ADDRESS: Word = 0xFFFF;

/// Start of VRAM
pub const VRAM_START: Word = 0x8000;

/// Start of OAM
pub const OAM_START: Word = 0xFE00;

/// Memory bus trait for reading and writing memory
pub trait MemoryBus {
    /// Read a byte from the given address
    fn read(&self, address: Word) -> Byte;

    /// Write a byte to the given address
    fn write(&mut self, address: Word, value: Byte);

    /// Read the stored byte, bypassing any register read masking
    ///
    /// Read-modify-write sequences on IF go through this so that unused bits
    /// reading back as 1 never leak into the stored value.
    fn read_raw(&self, address: Word) -> Byte {
        self.read(address)
    }
}

/// Flat 64KB memory map
pub struct Mmu {
    memory: Box<[Byte; 0x10000]>,
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

impl Mmu {
    /// Create a new memory map with registers in boot ROM skip state
    pub fn new() -> Self {
        let mut mmu = Self {
            memory: Box::new([0; 0x10000]),
        };
        mmu.init();
        mmu
    }

    /// Zero all memory and restore the boot ROM skip register values
    pub fn init(&mut self) {
        self.memory.fill(0);
        self.memory[LCDC_ADDRESS as usize] = 0x91; // LCD enabled, BG enabled
        self.memory[STAT_ADDRESS as usize] = 0x02; // Start in OAM scan mode (mode 2)
        self.memory[BGP_ADDRESS as usize] = 0xFC;
    }

    /// Copy a block of bytes starting at `address`, wrapping at the top of the map
    pub fn load(&mut self, address: Word, data: &[Byte]) {
        for (i, &value) in data.iter().enumerate() {
            let target = address.wrapping_add(i as Word);
            self.memory[target as usize] = value;
        }
    }
}

impl MemoryBus for Mmu {
    fn read(&self, address: Word) -> Byte {
        match address {
            STAT_ADDRESS => self.memory[address as usize] | 0x80, // Bit 7 always reads as 1
            IF_ADDRESS => self.memory[address as usize] | 0xE0,   // Upper 3 bits unused
            _ => self.memory[address as usize],
        }
    }

    fn write(&mut self, address: Word, value: Byte) {
        self.memory[address as usize] = value;
    }

    fn read_raw(&self, address: Word) -> Byte {
        self.memory[address as usize]
    }
}
