//! PPU Module
//!
//! This module implements the mode controller of the Pixel Processing Unit.
//! It sequences OAM search, pixel transfer, HBlank and VBlank against the
//! cycles reported by the CPU, drives the fetcher and pixel FIFO during
//! pixel transfer, and raises interrupt requests at mode boundaries.

pub mod fetcher;
pub mod modes;
pub mod pipeline;
pub mod tiles;

use log::{debug, trace};

use crate::common::{bit, bit_set, set_bit_mask, Byte};
use crate::interrupts::{self, InterruptKind};
use crate::lcd::{LcdControl, LcdScreen, LcdStatus, LCDC_ADDRESS, LY_ADDRESS, STAT_ADDRESS};
use crate::memory::MemoryBus;

use fetcher::{Fetcher, FetcherState};
use modes::PpuMode;
use pipeline::PixelFifo;
use tiles::BgTileMap;

/// STAT value ORed in when the HBlank request is raised
const HBLANK_STAT_LATCH: Byte = 0x08;

/// STAT value ORed in when the VBlank request is raised.
/// Sets the mode-1 bit alongside the VBlank select bit.
const VBLANK_STAT_LATCH: Byte = 0x11;

/// STAT bit checked before the HBlank request; cleared when a line starts
const HBLANK_LATCH_BIT: u8 = 3;

/// STAT bit checked before the VBlank request; cleared when a frame starts
const VBLANK_LATCH_BIT: u8 = 4;

/// Scanlines past the visible area before the frame wraps
const VBLANK_EXTRA_ROWS: usize = 9;

/// Pixel Processing Unit mode controller
#[derive(Debug)]
pub struct Ppu {
    mode: PpuMode,
    /// Cycles accumulated since the last mode transition
    clocks: u32,
    /// Cycles fed in since the current frame started
    frame_clocks: u64,
    last_frame_clocks: u64,
    current_frame: u64,
    screen: LcdScreen,
    tile_map: BgTileMap,
    fetcher: Fetcher,
    fifo: PixelFifo,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    /// Create a new PPU for the standard 160x144 screen
    pub fn new() -> Self {
        Self::with_screen(LcdScreen::default())
    }

    pub fn with_screen(screen: LcdScreen) -> Self {
        Self {
            mode: PpuMode::OamSearch,
            clocks: 0,
            frame_clocks: 0,
            last_frame_clocks: 0,
            current_frame: 0,
            screen,
            tile_map: BgTileMap::new(),
            fetcher: Fetcher::new(),
            fifo: PixelFifo::new(),
        }
    }

    /// Advance by the T-cycles the CPU just spent.
    ///
    /// Runs at most one mode transition per call; cycles past a mode's
    /// budget carry over into the next mode.
    pub fn tick<M: MemoryBus + ?Sized>(&mut self, mem: &mut M, cycles: u32) {
        self.frame_clocks += cycles as u64;
        self.clocks = self.clocks.saturating_add(cycles);

        match self.mode {
            PpuMode::OamSearch => self.oam_search(mem),
            PpuMode::PixelTransfer => self.pixel_transfer(mem, cycles),
            PpuMode::HBlank => self.hblank(mem),
            PpuMode::VBlank => self.vblank(mem),
        }
    }

    /// OAM search (mode 2) - 80 T-cycles
    fn oam_search<M: MemoryBus + ?Sized>(&mut self, mem: &mut M) {
        let budget = self.mode.budget();
        if self.clocks >= budget {
            self.clocks -= budget;
            self.set_mode(mem, PpuMode::PixelTransfer);

            let lcdc = LcdControl::from_bits_retain(mem.read(LCDC_ADDRESS));
            self.tile_map
                .find_visible_sprites(mem, self.screen.y, lcdc.sprite_height());
        }
    }

    /// Pixel transfer (mode 3) - 172 T-cycles nominal
    ///
    /// The FIFO and fetcher run in lockstep on this call's cycles, while
    /// the mode itself ends on the accumulated count. The two can drift
    /// apart when the FIFO stalls.
    fn pixel_transfer<M: MemoryBus + ?Sized>(&mut self, mem: &mut M, cycles: u32) {
        let mut remaining = cycles;
        while remaining > 0 {
            let work = self.fifo.process(&mut self.screen);
            self.fetcher.process(mem, &self.tile_map, &self.screen);

            if self.fetcher.state() == FetcherState::TransferReady && self.fifo.is_idle() {
                self.fifo.load(&mut self.fetcher);
            }

            remaining = remaining.saturating_sub(work.get());
        }

        let budget = self.mode.budget();
        if self.clocks >= budget {
            self.fifo.reset();
            self.fetcher.reset();
            self.clocks -= budget;
            self.set_mode(mem, PpuMode::HBlank);
        }
    }

    /// HBlank (mode 0) - 204 T-cycles
    fn hblank<M: MemoryBus + ?Sized>(&mut self, mem: &mut M) {
        let budget = self.mode.budget();
        if self.clocks >= budget {
            let stat = mem.read_raw(STAT_ADDRESS);
            if !bit(stat, HBLANK_LATCH_BIT) {
                raise(mem, InterruptKind::LcdStat, stat, HBLANK_STAT_LATCH);
            }

            self.clocks -= budget;
            self.increment_ly(mem);
            self.screen.x = 0;

            if self.screen.y + 1 == self.screen.height() {
                self.set_mode(mem, PpuMode::VBlank);
            } else {
                self.begin_line(mem);
            }
        }
    }

    /// VBlank (mode 1) - 456 T-cycles per scanline
    fn vblank<M: MemoryBus + ?Sized>(&mut self, mem: &mut M) {
        let budget = self.mode.budget();
        if self.clocks >= budget {
            let stat = mem.read_raw(STAT_ADDRESS);
            if !bit(stat, VBLANK_LATCH_BIT) {
                raise(mem, InterruptKind::VBlank, stat, VBLANK_STAT_LATCH);
            }

            self.increment_ly(mem);
            self.clocks -= budget;

            if self.screen.y > self.screen.height() + VBLANK_EXTRA_ROWS {
                self.screen.frame_ready = true;
                self.screen.y = 0;
                clear_latch(mem, VBLANK_LATCH_BIT);
                self.begin_line(mem);
                self.finish_frame();
            }
        }
    }

    /// Enter OAM search for a new scanline and re-arm the HBlank latch
    fn begin_line<M: MemoryBus + ?Sized>(&mut self, mem: &mut M) {
        self.set_mode(mem, PpuMode::OamSearch);
        clear_latch(mem, HBLANK_LATCH_BIT);
    }

    /// Store the current row in LY, then move to the next row.
    ///
    /// The row always fits: screens are at most `MAX_SCREEN_HEIGHT` tall.
    fn increment_ly<M: MemoryBus + ?Sized>(&mut self, mem: &mut M) {
        mem.write(LY_ADDRESS, self.screen.y as Byte);
        self.screen.y += 1;
    }

    fn set_mode<M: MemoryBus + ?Sized>(&mut self, mem: &mut M, mode: PpuMode) {
        trace!("line {}: {} -> {}", self.screen.y, self.mode, mode);
        self.mode = mode;

        let stat = mem.read_raw(STAT_ADDRESS) & !LcdStatus::MODE_MASK.bits();
        mem.write(STAT_ADDRESS, stat | mode.stat_bits());
    }

    fn finish_frame(&mut self) {
        // Leftover cycles already belong to the next frame
        self.last_frame_clocks = self.frame_clocks - self.clocks as u64;
        self.frame_clocks = self.clocks as u64;
        self.current_frame += 1;
        debug!(
            "frame {} complete after {} cycles",
            self.current_frame, self.last_frame_clocks
        );
    }

    pub fn mode(&self) -> PpuMode {
        self.mode
    }

    /// Cycles accumulated in the current mode
    pub fn clocks(&self) -> u32 {
        self.clocks
    }

    pub fn screen(&self) -> &LcdScreen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut LcdScreen {
        &mut self.screen
    }

    pub fn tile_map(&self) -> &BgTileMap {
        &self.tile_map
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn fifo(&self) -> &PixelFifo {
        &self.fifo
    }

    /// Number of frames completed
    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Cycles the last completed frame took
    pub fn last_frame_cycles(&self) -> u64 {
        self.last_frame_clocks
    }
}

/// Request an interrupt and latch the matching STAT bits
fn raise<M: MemoryBus + ?Sized>(mem: &mut M, kind: InterruptKind, stat: Byte, latch: Byte) {
    interrupts::request(mem, kind);
    mem.write(STAT_ADDRESS, set_bit_mask(stat, latch));
}

fn clear_latch<M: MemoryBus + ?Sized>(mem: &mut M, n: u8) {
    let mut stat = mem.read_raw(STAT_ADDRESS);
    bit_set(&mut stat, n, false);
    mem.write(STAT_ADDRESS, stat);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::{BGP_ADDRESS, SCREEN_HEIGHT, SCREEN_WIDTH};
    use crate::memory::{Mmu, IF_ADDRESS};
    use modes::{frame_cycles, CYCLES_PER_LINE, OAM_SEARCH_CYCLES, VBLANK_CYCLES};
    use proptest::prelude::*;

    const FRAME: u32 = 70224;

    fn run(ppu: &mut Ppu, mmu: &mut Mmu, total: u32, step: u32) {
        for _ in 0..total / step {
            ppu.tick(mmu, step);
        }
    }

    fn stat(mmu: &Mmu) -> Byte {
        mmu.read_raw(STAT_ADDRESS)
    }

    #[test]
    fn test_ppu_new() {
        let ppu = Ppu::new();
        assert_eq!(ppu.mode(), PpuMode::OamSearch);
        assert_eq!(ppu.clocks(), 0);
        assert_eq!(ppu.screen().width(), SCREEN_WIDTH);
        assert_eq!(ppu.screen().height(), SCREEN_HEIGHT);
        assert_eq!(frame_cycles(SCREEN_HEIGHT as u32), FRAME);
    }

    #[test]
    fn test_oam_search_same_for_any_granularity() {
        let mut coarse = Ppu::new();
        let mut coarse_mmu = Mmu::new();
        coarse.tick(&mut coarse_mmu, 80);

        let mut fine = Ppu::new();
        let mut fine_mmu = Mmu::new();
        for i in 0..80 {
            assert_eq!(fine.mode(), PpuMode::OamSearch, "left OAM search after {} cycles", i);
            fine.tick(&mut fine_mmu, 1);
        }

        assert_eq!(coarse.mode(), PpuMode::PixelTransfer);
        assert_eq!(fine.mode(), coarse.mode());
        assert_eq!(fine.clocks(), coarse.clocks());
        for address in [STAT_ADDRESS, LY_ADDRESS, IF_ADDRESS] {
            assert_eq!(fine_mmu.read_raw(address), coarse_mmu.read_raw(address));
        }
    }

    #[test]
    fn test_sprite_height_from_lcdc() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        mmu.write(LCDC_ADDRESS, 0x91);
        ppu.tick(&mut mmu, 80);
        assert_eq!(ppu.tile_map().sprite_height(), 8);

        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        mmu.write(LCDC_ADDRESS, 0x95);
        ppu.tick(&mut mmu, 80);
        assert_eq!(ppu.tile_map().sprite_height(), 16);
    }

    #[test]
    fn test_leftover_cycles_roll_over() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        ppu.tick(&mut mmu, 90);
        assert_eq!(ppu.mode(), PpuMode::PixelTransfer);
        assert_eq!(ppu.clocks(), 10);

        // 10 + 162 reaches the transfer budget
        ppu.tick(&mut mmu, 162);
        assert_eq!(ppu.mode(), PpuMode::HBlank);
        assert_eq!(ppu.clocks(), 0);
    }

    #[test]
    fn test_one_transition_per_tick() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        ppu.tick(&mut mmu, 1000);
        assert_eq!(ppu.mode(), PpuMode::PixelTransfer);
        assert_eq!(ppu.clocks(), 920);
    }

    #[test]
    fn test_hblank_raises_once_per_span() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        ppu.tick(&mut mmu, 80);
        ppu.tick(&mut mmu, 172);
        assert_eq!(ppu.mode(), PpuMode::HBlank);

        // Sub-budget ticks inside HBlank raise nothing
        for _ in 0..203 {
            ppu.tick(&mut mmu, 1);
            assert_eq!(ppu.mode(), PpuMode::HBlank);
        }
        assert_eq!(mmu.read_raw(IF_ADDRESS), 0);

        ppu.tick(&mut mmu, 1);
        assert_eq!(mmu.read_raw(IF_ADDRESS), InterruptKind::LcdStat.flag());
        assert_eq!(ppu.mode(), PpuMode::OamSearch);
        // Re-armed for the next line
        assert!(!bit(stat(&mmu), 3));

        mmu.write(IF_ADDRESS, 0);
        run(&mut ppu, &mut mmu, CYCLES_PER_LINE, 4);
        assert_eq!(ppu.screen().y, 2);
        assert_eq!(mmu.read_raw(IF_ADDRESS), InterruptKind::LcdStat.flag());
    }

    #[test]
    fn test_requests_every_line_and_frame() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        let mut stat_requests = [0usize; 3];
        let mut vblank_requests = [0usize; 3];

        for _ in 0..(FRAME * 3) / 4 {
            let frame = ppu.current_frame() as usize;
            ppu.tick(&mut mmu, 4);

            // Acknowledge IF only, as a handler would; STAT is left alone
            let flags = mmu.read_raw(IF_ADDRESS);
            if InterruptKind::LcdStat.is_set(flags) {
                stat_requests[frame] += 1;
            }
            if InterruptKind::VBlank.is_set(flags) {
                vblank_requests[frame] += 1;
            }
            mmu.write(IF_ADDRESS, 0);
        }

        assert_eq!(ppu.current_frame(), 3);
        assert_eq!(stat_requests, [SCREEN_HEIGHT - 1; 3]);
        assert_eq!(vblank_requests, [1; 3]);
    }

    #[test]
    fn test_software_latch_skips_one_line() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        mmu.write(STAT_ADDRESS, stat(&mmu) | HBLANK_STAT_LATCH);

        run(&mut ppu, &mut mmu, CYCLES_PER_LINE, 4);
        assert_eq!(mmu.read_raw(IF_ADDRESS), 0);
        assert!(!bit(stat(&mmu), 3));

        run(&mut ppu, &mut mmu, CYCLES_PER_LINE, 4);
        assert_eq!(mmu.read_raw(IF_ADDRESS), InterruptKind::LcdStat.flag());
    }

    #[test]
    fn test_vblank_latch_writes_raw_mask() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        mmu.write(STAT_ADDRESS, 0x08 | 0x02);

        run(&mut ppu, &mut mmu, CYCLES_PER_LINE * (SCREEN_HEIGHT as u32 - 1), 4);
        assert_eq!(ppu.mode(), PpuMode::VBlank);
        // Latched by the last visible line's HBlank
        assert_eq!(stat(&mmu) & 0x1F, 0x08 | 0x01);

        run(&mut ppu, &mut mmu, VBLANK_CYCLES, 4);
        assert_eq!(stat(&mmu) & 0x1F, 0x08 | 0x11);
        assert_eq!(
            mmu.read_raw(IF_ADDRESS),
            InterruptKind::VBlank.flag() | InterruptKind::LcdStat.flag()
        );

        // Both latches clear when the next frame starts
        run(&mut ppu, &mut mmu, VBLANK_CYCLES * 10, 4);
        assert_eq!(ppu.current_frame(), 1);
        assert_eq!(stat(&mmu) & 0x1F, PpuMode::OamSearch.stat_bits());
    }

    #[test]
    fn test_row_and_ly_advance_per_line() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();

        for line in 0..10 {
            assert_eq!(ppu.screen().y, line);
            run(&mut ppu, &mut mmu, CYCLES_PER_LINE, 4);
            assert_eq!(ppu.screen().y, line + 1);
            // LY holds the row before the increment
            assert_eq!(mmu.read(LY_ADDRESS) as usize, line);
            assert_eq!(ppu.screen().x, 0);
            assert_eq!(ppu.mode(), PpuMode::OamSearch);
        }
    }

    #[test]
    fn test_enters_vblank_after_visible_rows() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        run(&mut ppu, &mut mmu, CYCLES_PER_LINE * (SCREEN_HEIGHT as u32 - 1), 4);

        assert_eq!(ppu.mode(), PpuMode::VBlank);
        assert_eq!(ppu.screen().y, SCREEN_HEIGHT - 1);
        assert_eq!(stat(&mmu) & 0x03, PpuMode::VBlank.stat_bits());
        assert!(!ppu.screen().frame_ready);
    }

    #[test]
    fn test_full_frame_wraps() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();

        run(&mut ppu, &mut mmu, FRAME - 4, 4);
        assert_eq!(ppu.mode(), PpuMode::VBlank);
        assert!(!ppu.screen().frame_ready);

        ppu.tick(&mut mmu, 4);
        assert_eq!(ppu.mode(), PpuMode::OamSearch);
        assert_eq!(ppu.screen().y, 0);
        assert!(ppu.screen().frame_ready);
        assert_eq!(mmu.read(LY_ADDRESS), 153);
        assert_eq!(ppu.current_frame(), 1);
        assert_eq!(ppu.last_frame_cycles(), FRAME as u64);
        assert_eq!(stat(&mmu) & 0x03, PpuMode::OamSearch.stat_bits());
    }

    #[test]
    fn test_frame_ready_set_once_per_frame() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        let mut frames = 0;

        for _ in 0..(FRAME * 3) / 4 {
            ppu.tick(&mut mmu, 4);
            if ppu.screen_mut().take_frame() {
                frames += 1;
            }
        }

        assert_eq!(frames, 3);
        assert_eq!(ppu.current_frame(), 3);
    }

    #[test]
    fn test_pixel_transfer_draws_background_row() {
        let mut mmu = Mmu::new();
        mmu.write(LCDC_ADDRESS, 0x91);
        mmu.write(BGP_ADDRESS, 0b11_10_01_00);
        // Tile 0: every row color id 1
        for row in 0..8 {
            mmu.write(0x8000 + row * 2, 0xFF);
        }

        let mut ppu = Ppu::new();
        ppu.tick(&mut mmu, 80);
        ppu.tick(&mut mmu, 172);
        assert_eq!(ppu.mode(), PpuMode::HBlank);
        assert!(ppu.fifo().is_idle());
        assert_eq!(ppu.fetcher().state(), FetcherState::ReadTileNum);
        assert_eq!(ppu.fetcher().tile_cursor(), 0);

        for x in 0..SCREEN_WIDTH {
            assert_eq!(ppu.screen().pixel(x, 0), Some(1), "pixel {} not drawn", x);
        }
        assert_eq!(ppu.screen().pixel(0, 1), Some(0));
    }

    #[test]
    fn test_small_screen_frame() {
        let mut mmu = Mmu::new();
        let screen = LcdScreen::new(8, 4).unwrap();
        let mut ppu = Ppu::with_screen(screen);
        let frame = frame_cycles(4);
        assert_eq!(frame, 14 * CYCLES_PER_LINE);

        run(&mut ppu, &mut mmu, CYCLES_PER_LINE * 3, 4);
        assert_eq!(ppu.mode(), PpuMode::VBlank);

        run(&mut ppu, &mut mmu, frame - CYCLES_PER_LINE * 3, 4);
        assert_eq!(ppu.current_frame(), 1);
        assert_eq!(ppu.last_frame_cycles(), frame as u64);
        assert_eq!(mmu.read(LY_ADDRESS), 13);
    }

    #[test]
    fn test_shortest_screen_enters_vblank() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::with_screen(LcdScreen::new(8, 2).unwrap());
        run(&mut ppu, &mut mmu, CYCLES_PER_LINE, 4);
        assert_eq!(ppu.mode(), PpuMode::VBlank);

        run(&mut ppu, &mut mmu, frame_cycles(2) - CYCLES_PER_LINE, 4);
        assert_eq!(ppu.current_frame(), 1);
        assert_eq!(ppu.screen().y, 0);
    }

    #[test]
    fn test_zero_cycle_tick_is_harmless() {
        let mut mmu = Mmu::new();
        let mut ppu = Ppu::new();
        ppu.tick(&mut mmu, 80);
        ppu.tick(&mut mmu, 0);
        assert_eq!(ppu.mode(), PpuMode::PixelTransfer);
        assert_eq!(ppu.screen().x, 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn oam_search_ends_at_80_cycles(chunks in prop::collection::vec(1u32..=20, 1..40)) {
            let mut mmu = Mmu::new();
            let mut ppu = Ppu::new();
            let mut total = 0;

            for chunk in chunks {
                ppu.tick(&mut mmu, chunk);
                total += chunk;
                if total < OAM_SEARCH_CYCLES {
                    prop_assert_eq!(ppu.mode(), PpuMode::OamSearch);
                } else {
                    prop_assert_eq!(ppu.mode(), PpuMode::PixelTransfer);
                    prop_assert_eq!(ppu.clocks(), total - OAM_SEARCH_CYCLES);
                    break;
                }
            }
        }

        #[test]
        fn frame_length_independent_of_step(
            step in prop::sample::select(vec![1u32, 2, 3, 4, 6, 8, 12, 19, 24, 38, 57, 76])
        ) {
            let mut mmu = Mmu::new();
            let mut ppu = Ppu::new();

            run(&mut ppu, &mut mmu, FRAME - step, step);
            prop_assert!(!ppu.screen().frame_ready);

            ppu.tick(&mut mmu, step);
            prop_assert!(ppu.screen().frame_ready);
            prop_assert_eq!(ppu.mode(), PpuMode::OamSearch);
            prop_assert_eq!(ppu.screen().y, 0);
            prop_assert_eq!(ppu.last_frame_cycles(), FRAME as u64);
        }
    }
}
