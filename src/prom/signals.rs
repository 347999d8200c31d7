use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

/// A control line driven by the sync PROM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Signal {
    #[value(name = "hsync")]
    HSync,
    #[value(name = "vsync")]
    VSync,
    #[value(name = "hblank")]
    HBlank,
    #[value(name = "vblank")]
    VBlank,
    #[value(name = "hreset")]
    HReset,
    #[value(name = "vreset")]
    VReset,
    #[value(name = "display")]
    Display,
    /// One-shot: a blank interval is starting now.
    #[value(name = "blank-start")]
    BlankStart,
    /// One-shot: a blank interval is ending soon.
    #[value(name = "blank-end")]
    BlankEnd,
    /// Short pulse at the start of the vertical blank.
    #[value(name = "frame")]
    FrameStrobe,
}

impl Signal {
    pub const ALL: [Signal; 10] = [
        Signal::HSync,
        Signal::VSync,
        Signal::HBlank,
        Signal::VBlank,
        Signal::HReset,
        Signal::VReset,
        Signal::Display,
        Signal::BlankStart,
        Signal::BlankEnd,
        Signal::FrameStrobe,
    ];

    pub fn active_low(self) -> bool {
        matches!(
            self,
            Signal::HSync | Signal::VSync | Signal::HReset | Signal::VReset
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Signal::HSync => "HSYNC#",
            Signal::VSync => "VSYNC#",
            Signal::HBlank => "HBLANK",
            Signal::VBlank => "VBLANK",
            Signal::HReset => "HRESET#",
            Signal::VReset => "VRESET#",
            Signal::Display => "DISPLAY",
            Signal::BlankStart => "BLANK_START",
            Signal::BlankEnd => "BLANK_END",
            Signal::FrameStrobe => "FRAME",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One byte latched onto the control lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ControlWord(u8);

impl ControlWord {
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn bit(self, bit: u8) -> bool {
        self.0 & (1 << bit) != 0
    }
}

impl fmt::Binary for ControlWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

/// Bit assignment of each control line for one board. The sync and reset
/// lines are always wired; everything else is optional. Horizontal and
/// vertical blank may share a bit to form a combined blank line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalLayout {
    pub hsync: u8,
    pub vsync: u8,
    pub hreset: u8,
    pub vreset: u8,
    #[serde(default)]
    pub hblank: Option<u8>,
    #[serde(default)]
    pub vblank: Option<u8>,
    #[serde(default)]
    pub display: Option<u8>,
    #[serde(default)]
    pub blank_start: Option<u8>,
    #[serde(default)]
    pub blank_end: Option<u8>,
    #[serde(default)]
    pub frame_strobe: Option<u8>,
}

impl SignalLayout {
    pub fn bit(&self, signal: Signal) -> Option<u8> {
        match signal {
            Signal::HSync => Some(self.hsync),
            Signal::VSync => Some(self.vsync),
            Signal::HReset => Some(self.hreset),
            Signal::VReset => Some(self.vreset),
            Signal::HBlank => self.hblank,
            Signal::VBlank => self.vblank,
            Signal::Display => self.display,
            Signal::BlankStart => self.blank_start,
            Signal::BlankEnd => self.blank_end,
            Signal::FrameStrobe => self.frame_strobe,
        }
    }

    /// The resting word: every active-low line high, everything else low.
    pub fn idle(&self) -> ControlWord {
        let raw = Signal::ALL
            .iter()
            .filter(|signal| signal.active_low())
            .filter_map(|&signal| self.bit(signal))
            .fold(0u8, |raw, bit| raw | (1 << bit));
        ControlWord(raw)
    }

    /// Drive `signal` to its active level. Unwired lines are ignored.
    pub fn activate(&self, word: ControlWord, signal: Signal) -> ControlWord {
        match self.bit(signal) {
            Some(bit) if signal.active_low() => ControlWord(word.0 & !(1 << bit)),
            Some(bit) => ControlWord(word.0 | (1 << bit)),
            None => word,
        }
    }

    pub fn is_active(&self, word: ControlWord, signal: Signal) -> bool {
        match self.bit(signal) {
            Some(bit) => word.bit(bit) != signal.active_low(),
            None => false,
        }
    }

    /// Signals wired to `bit`, in declaration order.
    pub fn signals_at(&self, bit: u8) -> Vec<Signal> {
        Signal::ALL
            .iter()
            .copied()
            .filter(|&signal| self.bit(signal) == Some(bit))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut owner: [Option<Signal>; 8] = [None; 8];
        for signal in Signal::ALL {
            let Some(bit) = self.bit(signal) else {
                continue;
            };
            if bit >= 8 {
                return Err(ConfigError::BitOutOfRange { signal, bit });
            }
            match owner[bit as usize] {
                None => owner[bit as usize] = Some(signal),
                Some(Signal::HBlank) if signal == Signal::VBlank => {}
                Some(first) => {
                    return Err(ConfigError::BitCollision {
                        bit,
                        first,
                        second: signal,
                    });
                }
            }
        }
        Ok(())
    }
}
