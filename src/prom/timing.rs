//! Counter boundaries for the sync PROM. Each axis is split into a display
//! interval, front porch, sync, back porch and a counter-reset tail. Both
//! counters are eight bits wide, and the blank end must leave at least one
//! counter value for the reset, so every boundary lives in `0..256`.

use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

/// Number of distinct values of one 8-bit counter.
pub const COUNTER_RANGE: u16 = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Horizontal => f.write_str("horizontal"),
            Axis::Vertical => f.write_str("vertical"),
        }
    }
}

/// Where a counter value falls within its axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Display,
    FrontPorch,
    Sync,
    BackPorch,
    /// At or past the blank end: the counter should be reset here.
    Reset,
}

impl Phase {
    pub fn is_blank(self) -> bool {
        self != Phase::Display
    }
}

/// The four points of interest on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Boundaries {
    pub blank_start: u16,
    pub sync_start: u16,
    pub sync_end: u16,
    pub blank_end: u16,
}

impl Boundaries {
    pub fn phase(&self, value: u16) -> Phase {
        if value < self.blank_start {
            Phase::Display
        } else if value < self.sync_start {
            Phase::FrontPorch
        } else if value < self.sync_end {
            Phase::Sync
        } else if value < self.blank_end {
            Phase::BackPorch
        } else {
            Phase::Reset
        }
    }

    pub fn back_porch(&self) -> u16 {
        self.blank_end - self.sync_end
    }

    /// Values from the blank start up to (not including) the blank end.
    pub fn blank_len(&self) -> u16 {
        self.blank_end - self.blank_start
    }

    fn validate(&self, axis: Axis) -> Result<(), ConfigError> {
        if !(self.blank_start < self.sync_start
            && self.sync_start < self.sync_end
            && self.sync_end < self.blank_end)
        {
            return Err(ConfigError::NotIncreasing {
                axis,
                blank_start: self.blank_start,
                sync_start: self.sync_start,
                sync_end: self.sync_end,
                blank_end: self.blank_end,
            });
        }
        if self.blank_end >= COUNTER_RANGE {
            return Err(ConfigError::OutOfRange {
                axis,
                blank_end: self.blank_end,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct TimingConstants {
    pub horizontal: Boundaries,
    pub vertical: Boundaries,
    /// Horizontal counts before the blank end at which the blank ending
    /// strobe fires, giving the interrupt handler time to finish.
    pub irq_recovery: u16,
}

/// 640x480 timing with the pixel clock halved and the line count divided so
/// both counters fit in eight bits.
pub const TIMING_VGA_HALVED: TimingConstants = TimingConstants {
    horizontal: Boundaries {
        blank_start: 100,
        sync_start: 105,
        sync_end: 121,
        blank_end: 132,
    },
    vertical: Boundaries {
        blank_start: 216,
        sync_start: 217,
        sync_end: 221,
        blank_end: 244,
    },
    irq_recovery: 2,
};

impl TimingConstants {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.horizontal.validate(Axis::Horizontal)?;
        self.vertical.validate(Axis::Vertical)?;
        let porch = self.horizontal.back_porch();
        if self.irq_recovery == 0 || self.irq_recovery > porch {
            return Err(ConfigError::RecoveryOutsidePorch {
                offset: self.irq_recovery,
                porch,
            });
        }
        Ok(())
    }

    /// Horizontal count at which the blank ending strobe fires.
    pub fn blank_end_strobe(&self) -> u16 {
        self.horizontal.blank_end - self.irq_recovery
    }

    /// Visible window in (columns, rows).
    pub fn visible(&self) -> (u16, u16) {
        (self.horizontal.blank_start, self.vertical.blank_start)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, Phase::Display)]
    #[case(99, Phase::Display)]
    #[case(100, Phase::FrontPorch)]
    #[case(104, Phase::FrontPorch)]
    #[case(105, Phase::Sync)]
    #[case(120, Phase::Sync)]
    #[case(121, Phase::BackPorch)]
    #[case(131, Phase::BackPorch)]
    #[case(132, Phase::Reset)]
    #[case(255, Phase::Reset)]
    fn test_horizontal_phase(#[case] x: u16, #[case] phase: Phase) {
        assert_eq!(TIMING_VGA_HALVED.horizontal.phase(x), phase);
    }

    #[test]
    fn test_vga_halved_is_valid() {
        TIMING_VGA_HALVED.validate().unwrap();
        assert_eq!(TIMING_VGA_HALVED.visible(), (100, 216));
        assert_eq!(TIMING_VGA_HALVED.blank_end_strobe(), 130);
        assert_eq!(TIMING_VGA_HALVED.vertical.blank_len(), 28);
    }

    #[test]
    fn test_not_increasing() {
        let mut timing = TIMING_VGA_HALVED;
        timing.vertical.sync_end = timing.vertical.sync_start;
        assert!(matches!(
            timing.validate(),
            Err(ConfigError::NotIncreasing {
                axis: Axis::Vertical,
                ..
            })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let mut timing = TIMING_VGA_HALVED;
        timing.horizontal.blank_end = 255;
        timing.vertical.blank_end = 255;
        timing.validate().unwrap();

        timing.horizontal.blank_end = 256;
        assert!(matches!(
            timing.validate(),
            Err(ConfigError::OutOfRange {
                axis: Axis::Horizontal,
                blank_end: 256
            })
        ));

        timing.horizontal.blank_end = 132;
        timing.vertical.blank_end = 256;
        assert!(matches!(
            timing.validate(),
            Err(ConfigError::OutOfRange {
                axis: Axis::Vertical,
                blank_end: 256
            })
        ));
    }

    #[rstest]
    #[case(0)]
    #[case(12)]
    fn test_recovery_outside_porch(#[case] offset: u16) {
        let mut timing = TIMING_VGA_HALVED;
        timing.irq_recovery = offset;
        assert!(matches!(
            timing.validate(),
            Err(ConfigError::RecoveryOutsidePorch { porch: 11, .. })
        ));
    }
}
