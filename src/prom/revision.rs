//! Built-in sync PROM revisions. `sync-prom` reproduces the table of the
//! original board bit for bit. `split-blank` and `frame-irq` are example
//! configurations for alternative wirings: they run the same timing state
//! machine with a different bit layout and pulse policy. Custom boards can be
//! described in a TOML file:
//!
//! ```toml
//! name = "my-board"
//!
//! [timing]
//! irq_recovery = 2
//! horizontal = { blank_start = 100, sync_start = 105, sync_end = 121, blank_end = 132 }
//! vertical = { blank_start = 216, sync_start = 217, sync_end = 221, blank_end = 244 }
//!
//! [layout]
//! hsync = 0
//! vsync = 1
//! hreset = 4
//! vreset = 5
//! hblank = 6
//! vblank = 6
//! display = 7
//!
//! [policy]
//! reset_boundary = "exact"
//! filler = "single-pulse"
//! # optional, shown with their defaults
//! blank_end = "strobe"
//! blank_reset_tail = true
//! frame_strobe_lines = 0
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::prom::policy::{BlankEndPolicy, FillerPolicy, PulsePolicy, ResetBoundary};
use crate::prom::signals::SignalLayout;
use crate::prom::timing::{TIMING_VGA_HALVED, TimingConstants};

/// DI BI VCR# HCR# BIE BIS VSY# HSY#, with one blank line for both axes.
pub const LAYOUT_SYNC_PROM: SignalLayout = SignalLayout {
    hsync: 0,
    vsync: 1,
    blank_start: Some(2),
    blank_end: Some(3),
    hreset: 4,
    vreset: 5,
    hblank: Some(6),
    vblank: Some(6),
    display: Some(7),
    frame_strobe: None,
};

/// BIS DI VCR# HCR# VBL HBL VSY# HSY#
pub const LAYOUT_SPLIT_BLANK: SignalLayout = SignalLayout {
    hsync: 0,
    vsync: 1,
    hblank: Some(2),
    vblank: Some(3),
    hreset: 4,
    vreset: 5,
    display: Some(6),
    blank_start: Some(7),
    blank_end: None,
    frame_strobe: None,
};

/// FRAME VCR# HCR# BIE BIS BI VSY# HSY#, no display line.
pub const LAYOUT_FRAME_IRQ: SignalLayout = SignalLayout {
    hsync: 0,
    vsync: 1,
    hblank: Some(2),
    vblank: Some(2),
    blank_start: Some(3),
    blank_end: Some(4),
    hreset: 5,
    vreset: 6,
    frame_strobe: Some(7),
    display: None,
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Revision {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub timing: TimingConstants,
    pub layout: SignalLayout,
    pub policy: PulsePolicy,
}

impl Revision {
    pub fn builtins() -> Vec<Revision> {
        vec![
            Revision {
                name: "sync-prom".to_owned(),
                description: "Original board: combined blank line, blank end held through \
                              the vertical blank, reset held for the whole tail and filler"
                    .to_owned(),
                timing: TIMING_VGA_HALVED,
                layout: LAYOUT_SYNC_PROM,
                policy: PulsePolicy {
                    reset_boundary: ResetBoundary::Tail,
                    filler: FillerPolicy::Sustained,
                    blank_end: BlankEndPolicy::HeldOnBlankLines,
                    blank_reset_tail: false,
                    frame_strobe_lines: 0,
                },
            },
            Revision {
                name: "split-blank".to_owned(),
                description: "Example: separate blank lines, single reset pulses".to_owned(),
                timing: TIMING_VGA_HALVED,
                layout: LAYOUT_SPLIT_BLANK,
                policy: PulsePolicy {
                    reset_boundary: ResetBoundary::Exact,
                    filler: FillerPolicy::SinglePulse,
                    blank_end: BlankEndPolicy::Strobe,
                    blank_reset_tail: true,
                    frame_strobe_lines: 0,
                },
            },
            Revision {
                name: "frame-irq".to_owned(),
                description: "Example: two-line frame interrupt strobe, no display line"
                    .to_owned(),
                timing: TIMING_VGA_HALVED,
                layout: LAYOUT_FRAME_IRQ,
                policy: PulsePolicy {
                    reset_boundary: ResetBoundary::Exact,
                    filler: FillerPolicy::SinglePulse,
                    blank_end: BlankEndPolicy::Strobe,
                    blank_reset_tail: true,
                    frame_strobe_lines: 2,
                },
            },
        ]
    }

    pub fn builtin(name: &str) -> Result<Revision, ConfigError> {
        Self::builtins()
            .into_iter()
            .find(|revision| revision.name == name)
            .ok_or_else(|| ConfigError::UnknownRevision(name.to_owned()))
    }

    /// Load and validate a revision description from a TOML file.
    pub fn load(path: &Path) -> Result<Revision, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let revision: Revision = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        debug!("Loaded revision {:?} from {:?}", revision.name, path);
        revision.validate()?;
        Ok(revision)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        self.layout.validate()?;
        self.policy.validate(&self.timing)
    }

    /// One line per bit, most significant first.
    pub fn describe_layout(&self) -> Vec<String> {
        (0..8u8)
            .rev()
            .map(|bit| {
                let names: Vec<&str> = self
                    .layout
                    .signals_at(bit)
                    .into_iter()
                    .map(|signal| signal.name())
                    .collect();
                if names.is_empty() {
                    format!("  bit {bit}: -")
                } else {
                    format!("  bit {bit}: {}", names.join(" / "))
                }
            })
            .collect()
    }
}
