use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::prom::signals::Signal;
use crate::prom::timing::Axis;

/// Problems with a revision's timing, layout or policy. Always detected before
/// any table byte is produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "{axis} boundaries must be strictly increasing, got {blank_start} < {sync_start} < {sync_end} < {blank_end}"
    )]
    NotIncreasing {
        axis: Axis,
        blank_start: u16,
        sync_start: u16,
        sync_end: u16,
        blank_end: u16,
    },

    #[error("{axis} blank end {blank_end} leaves no counter value below 256 for the reset")]
    OutOfRange { axis: Axis, blank_end: u16 },

    #[error("irq recovery offset {offset} does not fit the {porch}-count horizontal back porch")]
    RecoveryOutsidePorch { offset: u16, porch: u16 },

    #[error("frame strobe of {lines} lines does not fit the {blank}-line vertical blank")]
    FrameStrobeOutsideBlank { lines: u16, blank: u16 },

    #[error("bit {bit} for {signal} is outside the 8-bit control word")]
    BitOutOfRange { signal: Signal, bit: u8 },

    #[error("bit {bit} is wired to both {first} and {second}")]
    BitCollision { bit: u8, first: Signal, second: Signal },

    #[error("unknown hardware revision {0:?}")]
    UnknownRevision(String),

    #[error("failed to read revision file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse revision file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The table could not be stored. The destination is left untouched.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write table to {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("failed to read table {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("table {path:?} is {len} bytes, expected {expected}")]
    WrongSize {
        path: PathBuf,
        len: usize,
        expected: usize,
    },
}
