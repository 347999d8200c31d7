//! Command exchange with a TommyPROM-style programmer: wait for the `>`
//! prompt, select the write address with `w<hex>`, then hand over to XMODEM.

use std::io::{Read, Write};

use tracing::{debug, info, warn};

use crate::programmer::TransferError;
use crate::programmer::xmodem::{self, BLOCK_SIZE, TransferSession};

pub const BAUD_RATE: u32 = 115200;
const PROMPT: u8 = b'>';

/// Device size in bytes for a size given in KiB.
pub fn rom_size_bytes(kib: usize) -> Result<usize, TransferError> {
    kib.checked_mul(1024).ok_or(TransferError::RomTooLarge { kib })
}

/// Which part of a file goes where on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadPlan {
    pub offset: usize,
    pub start: usize,
    /// Always a whole number of blocks.
    pub len: usize,
}

impl UploadPlan {
    /// Write from `offset` in the file to `start` on a `rom_size`-byte
    /// device, at most `bytes` bytes (default: up to the end of the device).
    pub fn new(
        offset: usize,
        start: usize,
        bytes: Option<usize>,
        rom_size: usize,
    ) -> Result<Self, TransferError> {
        let available = rom_size
            .checked_sub(start)
            .ok_or(TransferError::StartPastEnd { start, rom_size })?;
        let len = bytes.filter(|&b| b > 0).map_or(available, |b| b.min(available));
        Ok(Self {
            offset,
            start,
            len: len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE,
        })
    }

    /// The bytes to send. A short tail is padded by the block transfer.
    pub fn select<'a>(&self, file: &'a [u8]) -> Result<&'a [u8], TransferError> {
        if self.offset >= file.len() {
            return Err(TransferError::EmptyImage {
                offset: self.offset,
                len: file.len(),
            });
        }
        let end = file.len().min(self.offset + self.len);
        Ok(&file[self.offset..end])
    }
}

pub struct Programmer<P> {
    port: P,
}

impl<P: Read + Write> Programmer<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    fn read_until(&mut self, end: u8) -> Result<String, TransferError> {
        let mut received = Vec::new();
        let mut buf = [0; 1];
        loop {
            match self.port.read(&mut buf) {
                Ok(1) => {
                    received.push(buf[0]);
                    if buf[0] == end {
                        return Ok(String::from_utf8_lossy(&received).into_owned());
                    }
                }
                Ok(_) => break,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }
        Err(TransferError::NoPrompt {
            received: String::from_utf8_lossy(&received).into_owned(),
        })
    }

    /// Everything up to and including the next `>` prompt.
    pub fn read_prompt(&mut self) -> Result<String, TransferError> {
        self.read_until(PROMPT)
    }

    fn read_line(&mut self) -> Result<String, TransferError> {
        self.read_until(b'\n')
    }

    /// Write `image` to the device starting at `start`.
    pub fn upload(&mut self, image: &[u8], start: usize) -> Result<TransferSession, TransferError> {
        let banner = self.read_prompt()?;
        info!("{}", banner.trim_end());

        debug!("Selecting write address {start:#x}");
        write!(self.port, "w{start:x}\r")?;
        self.port.flush()?;
        // The write command answers with two lines rather than a prompt
        for _ in 0..2 {
            let line = self.read_line()?;
            info!("{}", line.trim_end());
        }

        let mut session = TransferSession::new();
        let sent = xmodem::send(&mut self.port, image, &mut session);
        match self.read_prompt() {
            Ok(response) => info!("{}", response.trim_end()),
            Err(e) => warn!("No prompt after transfer: {e}"),
        }
        sent?;
        Ok(session)
    }

    #[cfg(test)]
    pub fn into_inner(self) -> P {
        self.port
    }
}
