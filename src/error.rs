//! Errors
//!
//! Screen construction and the runner's setup are the only fallible steps;
//! ticking the PPU cannot fail.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("unsupported screen size {width}x{height}")]
    ScreenSize { width: usize, height: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
