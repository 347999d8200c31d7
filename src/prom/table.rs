use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use bit_set::BitSet;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::WriteError;
use crate::prom::compose::Composer;
use crate::prom::signals::{ControlWord, Signal, SignalLayout};

/// Number of bytes in a sync table: one per (y, x) counter pair.
pub const TABLE_SIZE: usize = 0x10000;

/// Raw counter state. The vertical counter drives the high address byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub x: u8,
    pub y: u8,
}

impl Address {
    pub const fn index(self) -> usize {
        (self.y as usize) << 8 | self.x as usize
    }

    pub const fn from_index(index: usize) -> Self {
        Self {
            x: (index & 0xff) as u8,
            y: ((index >> 8) & 0xff) as u8,
        }
    }

    /// Every address in table order: `y` outer, `x` inner.
    pub fn all() -> impl Iterator<Item = Address> {
        (0..=255u8).flat_map(|y| (0..=255u8).map(move |x| Address { x, y }))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X} (x={}, y={})", self.index(), self.x, self.y)
    }
}

/// A complete compiled sync PROM image.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncTable {
    bytes: Box<[u8]>,
}

impl fmt::Debug for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTable")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

impl SyncTable {
    pub fn compile(composer: &Composer) -> Self {
        let bytes: Box<[u8]> = Address::all()
            .map(|address| composer.compose(address).raw())
            .collect();
        debug_assert_eq!(bytes.len(), TABLE_SIZE);
        Self { bytes }
    }

    /// Wrap an existing image. Returns the bytes back if the length is wrong.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Vec<u8>> {
        if bytes.len() != TABLE_SIZE {
            return Err(bytes);
        }
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    pub fn get(&self, address: Address) -> ControlWord {
        ControlWord::from_raw(self.bytes[address.index()])
    }

    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Addresses (as table indices) at which `signal` is active.
    pub fn addresses_where(&self, layout: &SignalLayout, signal: Signal) -> BitSet {
        let mut set = BitSet::with_capacity(TABLE_SIZE);
        for (index, &raw) in self.bytes.iter().enumerate() {
            if layout.is_active(ControlWord::from_raw(raw), signal) {
                set.insert(index);
            }
        }
        set
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.bytes)?;
        writer.flush()
    }

    /// Store the table at `path`. The bytes land in a temporary file next to
    /// the destination which is only renamed into place once complete.
    pub fn save(&self, path: &Path) -> Result<(), WriteError> {
        let wrap = |source: io::Error| WriteError::Io {
            path: path.to_owned(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir).map_err(wrap)?;
        debug!("Writing table to {:?}", file.path());
        self.write_to(&mut file).map_err(wrap)?;
        file.as_file().sync_all().map_err(wrap)?;
        file.persist(path).map_err(|e| wrap(e.error))?;

        info!("Wrote {} bytes to {:?}", self.bytes.len(), path);
        Ok(())
    }
}
