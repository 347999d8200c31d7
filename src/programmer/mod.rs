//! Uploading images to an EEPROM programmer over a serial link.

pub mod tommyprom;
pub mod xmodem;

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("programmer link failed")]
    Io(#[from] io::Error),

    #[error("receiver cancelled the transfer")]
    Cancelled,

    #[error("receiver never requested a transfer")]
    NoStart,

    #[error("block {block} was not acknowledged after repeated attempts")]
    TooManyErrors { block: usize },

    #[error("receiver did not acknowledge the end of transmission")]
    EotNotAcknowledged,

    #[error("programmer prompt not received (got {received:?})")]
    NoPrompt { received: String },

    #[error("ROM size of {kib} KiB does not fit in memory")]
    RomTooLarge { kib: usize },

    #[error("start address {start:#x} is past the end of a {rom_size:#x}-byte ROM")]
    StartPastEnd { start: usize, rom_size: usize },

    #[error("nothing to send: offset {offset:#x} is past the end of the {len}-byte file")]
    EmptyImage { offset: usize, len: usize },
}
