use crate::prom::policy::{BlankEndPolicy, PulsePolicy};
use crate::prom::signals::{ControlWord, Signal, SignalLayout};
use crate::prom::timing::{Boundaries, Phase};

/// What the horizontal classifier needs to know about the current line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineContext {
    pub phase: Phase,
    /// First line of the vertical blank.
    pub first_blank_line: bool,
    /// Last line before the vertical blank ends.
    pub last_blank_line: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct VerticalClassifier {
    bounds: Boundaries,
    layout: SignalLayout,
    policy: PulsePolicy,
}

impl VerticalClassifier {
    pub fn new(bounds: Boundaries, layout: SignalLayout, policy: PulsePolicy) -> Self {
        Self {
            bounds,
            layout,
            policy,
        }
    }

    pub fn line(&self, y: u16) -> LineContext {
        LineContext {
            phase: self.bounds.phase(y),
            first_blank_line: y == self.bounds.blank_start,
            last_blank_line: y + 1 == self.bounds.blank_end,
        }
    }

    /// Apply the vertical adjustments for line `y`. Filler rows (the reset
    /// phase) are left to the composer.
    pub fn apply(&self, y: u16, line: &LineContext, mut word: ControlWord) -> ControlWord {
        let blank_line = matches!(
            line.phase,
            Phase::FrontPorch | Phase::Sync | Phase::BackPorch
        );
        if blank_line {
            word = self.layout.activate(word, Signal::VBlank);
            if self.policy.blank_end == BlankEndPolicy::HeldOnBlankLines {
                word = self.layout.activate(word, Signal::BlankEnd);
            }
        }
        if line.phase == Phase::Sync {
            word = self.layout.activate(word, Signal::VSync);
        }

        let strobe_start = self.bounds.blank_start;
        if (strobe_start..strobe_start + self.policy.frame_strobe_lines).contains(&y) {
            word = self.layout.activate(word, Signal::FrameStrobe);
        }
        word
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::prom::policy::{FillerPolicy, ResetBoundary};
    use crate::prom::revision::LAYOUT_FRAME_IRQ;
    use crate::prom::timing::TIMING_VGA_HALVED;

    fn classifier(frame_strobe_lines: u16) -> VerticalClassifier {
        classifier_with(frame_strobe_lines, BlankEndPolicy::Strobe)
    }

    fn classifier_with(frame_strobe_lines: u16, blank_end: BlankEndPolicy) -> VerticalClassifier {
        let policy = PulsePolicy {
            reset_boundary: ResetBoundary::Exact,
            filler: FillerPolicy::SinglePulse,
            blank_end,
            blank_reset_tail: true,
            frame_strobe_lines,
        };
        VerticalClassifier::new(TIMING_VGA_HALVED.vertical, LAYOUT_FRAME_IRQ, policy)
    }

    fn word_for(classifier: &VerticalClassifier, y: u16) -> ControlWord {
        let line = classifier.line(y);
        classifier.apply(y, &line, LAYOUT_FRAME_IRQ.idle())
    }

    #[test]
    fn test_line_flags() {
        let classifier = classifier(0);
        let line = classifier.line(216);
        assert_eq!(line.phase, Phase::FrontPorch);
        assert!(line.first_blank_line);
        assert!(!line.last_blank_line);

        let line = classifier.line(243);
        assert_eq!(line.phase, Phase::BackPorch);
        assert!(!line.first_blank_line);
        assert!(line.last_blank_line);

        assert_eq!(classifier.line(244).phase, Phase::Reset);
    }

    #[rstest]
    #[case(0, false, false)]
    #[case(215, false, false)]
    #[case(216, true, false)]
    #[case(217, true, true)]
    #[case(220, true, true)]
    #[case(221, true, false)]
    #[case(243, true, false)]
    fn test_vertical_bits(#[case] y: u16, #[case] blank: bool, #[case] sync: bool) {
        let classifier = classifier(0);
        let word = word_for(&classifier, y);
        assert_eq!(LAYOUT_FRAME_IRQ.is_active(word, Signal::VBlank), blank);
        assert_eq!(LAYOUT_FRAME_IRQ.is_active(word, Signal::VSync), sync);
        assert!(!LAYOUT_FRAME_IRQ.is_active(word, Signal::VReset));
        assert!(!LAYOUT_FRAME_IRQ.is_active(word, Signal::BlankEnd));
    }

    #[test]
    fn test_blank_end_held_on_blank_lines() {
        let classifier = classifier_with(0, BlankEndPolicy::HeldOnBlankLines);
        let held: Vec<u16> = (0..256)
            .filter(|&y| {
                LAYOUT_FRAME_IRQ.is_active(word_for(&classifier, y), Signal::BlankEnd)
            })
            .collect();
        assert_eq!(held, (216..244).collect::<Vec<_>>());
    }

    #[test]
    fn test_frame_strobe_width() {
        let strobed = |lines| -> Vec<u16> {
            let classifier = classifier(lines);
            (0..256)
                .filter(|&y| {
                    LAYOUT_FRAME_IRQ.is_active(word_for(&classifier, y), Signal::FrameStrobe)
                })
                .collect()
        };
        assert_eq!(strobed(2), vec![216, 217]);
        assert!(strobed(0).is_empty());
    }
}
