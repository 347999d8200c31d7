use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::InspectError;
use crate::prom::signals::{Signal, SignalLayout};
use crate::prom::table::{Address, SyncTable, TABLE_SIZE};

pub fn load_table(path: &Path) -> Result<SyncTable, InspectError> {
    let bytes = fs::read(path).map_err(|source| InspectError::Read {
        path: path.to_owned(),
        source,
    })?;
    debug!("Read {} bytes from {:?}", bytes.len(), path);
    SyncTable::from_bytes(bytes).map_err(|bytes| InspectError::WrongSize {
        path: path.to_owned(),
        len: bytes.len(),
        expected: TABLE_SIZE,
    })
}

/// Every address at which `signal` is active, formatted with its raw byte.
pub fn find_signal(table: &SyncTable, layout: &SignalLayout, signal: Signal) -> Vec<String> {
    table
        .addresses_where(layout, signal)
        .iter()
        .map(|index| {
            let address = Address::from_index(index);
            format!("{address} {:08b}", table.get(address))
        })
        .collect()
}
