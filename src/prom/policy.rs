//! Behaviours that differ between board revisions even though the timing
//! state machine is the same.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::prom::timing::TimingConstants;

/// Which horizontal counts past the blank end clear the counter reset line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetBoundary {
    /// Only `x == blank_end`.
    Exact,
    /// Every `x >= blank_end`.
    Tail,
}

impl ResetBoundary {
    pub fn clears(self, x: u16, blank_end: u16) -> bool {
        match self {
            ResetBoundary::Exact => x == blank_end,
            ResetBoundary::Tail => x >= blank_end,
        }
    }
}

/// Contents of the rows at or past the vertical blank end. Those rows are
/// never displayed but the counters can land there at power up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillerPolicy {
    /// Idle everywhere except the first filler address, which resets both
    /// counters.
    SinglePulse,
    /// Both counter resets held for the whole region.
    Sustained,
}

/// Behaviour of the blank ending line on vertical blank lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlankEndPolicy {
    /// One count per display line, plus one on the last blank line.
    #[default]
    Strobe,
    /// As `Strobe` on display lines, but held for every count of the
    /// vertical blank lines.
    HeldOnBlankLines,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PulsePolicy {
    pub reset_boundary: ResetBoundary,
    pub filler: FillerPolicy,
    #[serde(default)]
    pub blank_end: BlankEndPolicy,
    /// Whether the horizontal blank stays asserted from the blank end to the
    /// end of the line.
    #[serde(default = "blank_reset_tail")]
    pub blank_reset_tail: bool,
    /// Lines the frame strobe stays active from the vertical blank start.
    #[serde(default)]
    pub frame_strobe_lines: u16,
}

fn blank_reset_tail() -> bool {
    true
}

impl PulsePolicy {
    pub fn validate(&self, timing: &TimingConstants) -> Result<(), ConfigError> {
        let blank = timing.vertical.blank_len();
        if self.frame_strobe_lines > blank {
            return Err(ConfigError::FrameStrobeOutsideBlank {
                lines: self.frame_strobe_lines,
                blank,
            });
        }
        Ok(())
    }
}
