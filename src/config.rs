//! Runner configuration
//!
//! Loaded from a TOML file; every field falls back to its default.
//!
//! ```toml
//! [run]
//! frames = 60
//! cycles_per_tick = 4
//! log_level = "info"
//!
//! [registers]
//! lcdc = 0x91
//! scx = 0
//! scy = 0
//! bgp = 0xFC
//! ie = 0x03
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::Byte;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub run: Run,
    pub registers: Registers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Run {
    /// Frames to emulate before stopping
    pub frames: u64,
    /// T-cycles passed to each PPU tick (one CPU step)
    pub cycles_per_tick: u32,
    /// Log filter used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            frames: 60,
            cycles_per_tick: 4,
            log_level: "info".into(),
        }
    }
}

/// Register values written before the first tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registers {
    pub lcdc: Byte,
    pub scx: Byte,
    pub scy: Byte,
    pub bgp: Byte,
    pub ie: Byte,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            lcdc: 0x91,
            scx: 0,
            scy: 0,
            bgp: 0xFC,
            ie: 0x03, // VBlank + LCD STAT
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("{} not found; using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.run.cycles_per_tick == 0 {
            return Err(Error::Config("cycles_per_tick must be at least 1".into()));
        }
        Ok(())
    }
}
