//! Game Boy PPU Core
//!
//! This library provides a cycle-timed model of the Game Boy video
//! controller: the mode state machine, the background fetcher and pixel
//! FIFO it drives, and the interrupt requests it raises.

pub mod common;
pub mod config;
pub mod error;
pub mod interrupts;
pub mod lcd;
pub mod memory;
pub mod ppu;

pub use error::{Error, Result};
