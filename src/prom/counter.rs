//! How the card's raw counters reach the PROM address lines. The lowest bit of
//! the pixel counter is not wired, so one column lasts two pixels. The line
//! counter is ten bits wide and its bits 7 and 8 are not wired, so the timing
//! rows are reached from raw line counts well past 255.

use crate::prom::timing::{Axis, Boundaries, TimingConstants};

/// Distinct values of the 10-bit line counter.
pub const LINE_COUNTER_RANGE: u16 = 1024;

/// Line count at which the bring-up listing stops by default.
pub const DEFAULT_LINE_LIMIT: u16 = 630;

/// PROM row addressed by raw line count `line`.
pub fn row_for_line(line: u16) -> u16 {
    ((line >> 9) & 1) << 7 | (line & 0x7f)
}

/// PROM column addressed by raw pixel count `pixel`.
pub fn column_for_pixel(pixel: u16) -> u16 {
    (pixel >> 1) & 0xff
}

/// Raw line counts below `limit` that address `row`.
pub fn lines_for_row(row: u16, limit: u16) -> Vec<u16> {
    (0..limit.min(LINE_COUNTER_RANGE))
        .filter(|&line| row_for_line(line) == row)
        .collect()
}

fn named(bounds: &Boundaries) -> [(&'static str, u16); 4] {
    [
        ("blank start", bounds.blank_start),
        ("sync start", bounds.sync_start),
        ("sync end", bounds.sync_end),
        ("blank end", bounds.blank_end),
    ]
}

fn join(counts: &[u16]) -> String {
    if counts.is_empty() {
        return "-".to_owned();
    }
    counts
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per timing boundary with the raw counter values that reach it.
pub fn describe_boundaries(timing: &TimingConstants, line_limit: u16) -> Vec<String> {
    let mut lines = Vec::new();
    for (name, column) in named(&timing.horizontal) {
        lines.push(format!(
            "{} {name} {column}: pixels {}",
            Axis::Horizontal,
            join(&[column * 2, column * 2 + 1])
        ));
    }
    for (name, row) in named(&timing.vertical) {
        lines.push(format!(
            "{} {name} {row}: lines {}",
            Axis::Vertical,
            join(&lines_for_row(row, line_limit))
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::prom::timing::TIMING_VGA_HALVED;

    #[rstest]
    #[case(0, 0)]
    #[case(88, 88)]
    #[case(127, 127)]
    #[case(128, 0)]
    #[case(600, 216)]
    #[case(628, 244)]
    #[case(1023, 255)]
    fn test_row_for_line(#[case] line: u16, #[case] row: u16) {
        assert_eq!(row_for_line(line), row);
    }

    #[test]
    fn test_column_for_pixel() {
        assert_eq!(column_for_pixel(200), 100);
        assert_eq!(column_for_pixel(201), 100);
        assert_eq!(column_for_pixel(511), 255);
    }

    #[test]
    fn test_vertical_boundaries() {
        assert_eq!(lines_for_row(216, DEFAULT_LINE_LIMIT), vec![600]);
        assert_eq!(lines_for_row(244, DEFAULT_LINE_LIMIT), vec![628]);
        assert_eq!(lines_for_row(244, 600), Vec::<u16>::new());
        assert_eq!(lines_for_row(216, LINE_COUNTER_RANGE), vec![600, 728, 856, 984]);
    }

    #[test]
    fn test_describe_boundaries() {
        let lines = describe_boundaries(&TIMING_VGA_HALVED, DEFAULT_LINE_LIMIT);
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "horizontal blank start 100: pixels 200, 201");
        assert_eq!(lines[4], "vertical blank start 216: lines 600");
        assert_eq!(lines[5], "vertical sync start 217: lines 601");
        assert_eq!(lines[6], "vertical sync end 221: lines 605");
        assert_eq!(lines[7], "vertical blank end 244: lines 628");
    }
}
