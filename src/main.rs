//! Game Boy PPU - Headless Runner
//!
//! Drives the PPU the way a CPU stepping loop would: tick by a fixed number
//! of cycles per step, and resolve and acknowledge interrupts in between.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::process;

use log::{debug, info};

use gbppu::config::Config;
use gbppu::interrupts::InterruptController;
use gbppu::lcd::{BGP_ADDRESS, LCDC_ADDRESS, SCX_ADDRESS, SCY_ADDRESS};
use gbppu::memory::{MemoryBus, Mmu, IE_ADDRESS, VRAM_START};
use gbppu::ppu::Ppu;

fn main() {
    let args: Vec<String> = env::args().collect();
    let config_path = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("gb-ppu.toml"));

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.run.log_level)).init();

    run(&config);
}

fn run(config: &Config) {
    let mut mmu = Mmu::new();
    seed(&mut mmu, config);

    let mut ppu = Ppu::new();
    let mut controller = InterruptController::new();
    // EI before the loop; each handler returns with RETI
    controller.ime = true;
    let mut serviced: BTreeMap<u16, u64> = BTreeMap::new();
    let step = config.run.cycles_per_tick;

    info!(
        "Running {} frames at {} cycles per step",
        config.run.frames, step
    );

    while ppu.current_frame() < config.run.frames {
        ppu.tick(&mut mmu, step);

        if let Some(pending) = controller.service(&mut mmu) {
            debug!("servicing {:?} at {:#06X}", pending.kind(), pending.vector());
            *serviced.entry(pending.vector()).or_default() += 1;
            controller.return_from_interrupt();
        }

        if ppu.screen_mut().take_frame() {
            info!(
                "frame {}: {} cycles",
                ppu.current_frame(),
                ppu.last_frame_cycles()
            );
        }
    }

    println!("Frames: {}", ppu.current_frame());
    println!("Cycles per frame: {}", ppu.last_frame_cycles());
    for (vector, count) in &serviced {
        println!("Interrupt {:#06X}: {} serviced", vector, count);
    }
}

/// Write configured registers and a checkerboard background into memory
fn seed(mmu: &mut Mmu, config: &Config) {
    let regs = &config.registers;
    mmu.write(LCDC_ADDRESS, regs.lcdc);
    mmu.write(SCX_ADDRESS, regs.scx);
    mmu.write(SCY_ADDRESS, regs.scy);
    mmu.write(BGP_ADDRESS, regs.bgp);
    mmu.write(IE_ADDRESS, regs.ie);

    // Tile 0 blank, tile 1 solid color 3
    mmu.load(VRAM_START + 16, &[0xFF; 16]);
    // Same tiles at 0x9000 for signed addressing
    mmu.load(0x9010, &[0xFF; 16]);

    for row in 0..32u16 {
        for col in 0..32u16 {
            let tile = ((row + col) % 2) as u8;
            mmu.write(0x9800 + row * 32 + col, tile);
            mmu.write(0x9C00 + row * 32 + col, tile);
        }
    }
}
