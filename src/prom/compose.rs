use crate::error::ConfigError;
use crate::prom::horizontal::HorizontalClassifier;
use crate::prom::policy::FillerPolicy;
use crate::prom::revision::Revision;
use crate::prom::signals::{ControlWord, Signal, SignalLayout};
use crate::prom::table::Address;
use crate::prom::timing::Phase;
use crate::prom::vertical::VerticalClassifier;

/// Builds the control word for a single address.
#[derive(Clone, Copy, Debug)]
pub struct Composer {
    layout: SignalLayout,
    filler: FillerPolicy,
    filler_row: u16,
    horizontal: HorizontalClassifier,
    vertical: VerticalClassifier,
}

impl Composer {
    /// Validate the revision and prepare both classifiers.
    pub fn new(revision: &Revision) -> Result<Self, ConfigError> {
        revision.validate()?;
        let timing = &revision.timing;
        let policy = &revision.policy;
        Ok(Self {
            layout: revision.layout,
            filler: policy.filler,
            filler_row: timing.vertical.blank_end,
            horizontal: HorizontalClassifier::new(
                timing.horizontal,
                revision.layout,
                *policy,
                timing.blank_end_strobe(),
            ),
            vertical: VerticalClassifier::new(timing.vertical, revision.layout, *policy),
        })
    }

    pub fn compose(&self, address: Address) -> ControlWord {
        let x = address.x as u16;
        let y = address.y as u16;
        let line = self.vertical.line(y);
        if line.phase == Phase::Reset {
            return self.filler(x, y);
        }

        let mut word = self.layout.idle();
        if line.phase == Phase::Display && self.horizontal.phase(x) == Phase::Display {
            word = self.layout.activate(word, Signal::Display);
        }
        word = self.vertical.apply(y, &line, word);
        self.horizontal.apply(x, &line, word)
    }

    fn filler(&self, x: u16, y: u16) -> ControlWord {
        let reset = match self.filler {
            FillerPolicy::SinglePulse => x == 0 && y == self.filler_row,
            FillerPolicy::Sustained => true,
        };
        let mut word = self.layout.idle();
        if reset {
            word = self.layout.activate(word, Signal::HReset);
            word = self.layout.activate(word, Signal::VReset);
        }
        word
    }
}
