//! The sync PROM compiler. The ROM's address lines are wired to the
//! horizontal (low byte) and vertical (high byte) counters and its data lines
//! drive the sync, blank and counter reset signals, so the whole video timing
//! is decided here at build time.

pub mod compose;
pub mod counter;
pub mod horizontal;
pub mod inspect;
pub mod policy;
pub mod revision;
pub mod signals;
pub mod table;
pub mod timing;
pub mod vertical;

use tracing::info;

use crate::error::ConfigError;

use self::compose::Composer;
use self::revision::Revision;
use self::table::SyncTable;

/// Validate `revision` and build its full table.
pub fn compile(revision: &Revision) -> Result<SyncTable, ConfigError> {
    let composer = Composer::new(revision)?;
    info!("Compiling sync table for revision {:?}", revision.name);
    Ok(SyncTable::compile(&composer))
}
