use crate::prom::policy::PulsePolicy;
use crate::prom::signals::{ControlWord, Signal, SignalLayout};
use crate::prom::timing::{Boundaries, Phase};
use crate::prom::vertical::LineContext;

#[derive(Clone, Copy, Debug)]
pub struct HorizontalClassifier {
    bounds: Boundaries,
    layout: SignalLayout,
    policy: PulsePolicy,
    /// Count at which the blank ending strobe fires.
    blank_end_strobe: u16,
}

impl HorizontalClassifier {
    pub fn new(
        bounds: Boundaries,
        layout: SignalLayout,
        policy: PulsePolicy,
        blank_end_strobe: u16,
    ) -> Self {
        Self {
            bounds,
            layout,
            policy,
            blank_end_strobe,
        }
    }

    pub fn phase(&self, x: u16) -> Phase {
        self.bounds.phase(x)
    }

    /// Apply the horizontal adjustments for `x` on a line described by `line`.
    pub fn apply(&self, x: u16, line: &LineContext, mut word: ControlWord) -> ControlWord {
        let layout = &self.layout;
        let phase = self.bounds.phase(x);
        let blank = match phase {
            Phase::Reset => self.policy.blank_reset_tail,
            _ => phase.is_blank(),
        };
        if blank {
            word = layout.activate(word, Signal::HBlank);
        }

        match phase {
            Phase::Display => {
                // The whole first line of the vertical blank is blank, so the
                // frame's blank starts at its first count.
                if line.first_blank_line && x == 0 {
                    word = layout.activate(word, Signal::BlankStart);
                }
            }
            Phase::FrontPorch => {
                if line.phase == Phase::Display && x == self.bounds.blank_start {
                    word = layout.activate(word, Signal::BlankStart);
                }
            }
            Phase::Sync => {
                word = layout.activate(word, Signal::HSync);
            }
            Phase::BackPorch => {
                // The last blank line still warns the consumer that active
                // video is about to resume.
                let armed = line.phase == Phase::Display || line.last_blank_line;
                if armed && x == self.blank_end_strobe {
                    word = layout.activate(word, Signal::BlankEnd);
                }
            }
            Phase::Reset => {
                if self.policy.reset_boundary.clears(x, self.bounds.blank_end) {
                    word = layout.activate(word, Signal::HReset);
                }
            }
        }
        word
    }
}
