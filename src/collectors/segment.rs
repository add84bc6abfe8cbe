//! Splits the status text into the personalities header and one line-group
//! per array.
//!
//! The segmenter is a small state machine so that short blocks, stray lines
//! and the trailing `unused devices` marker are handled explicitly:
//!
//! ```text
//! ExpectHeader ─header─▶ ExpectArrayStart ─start─▶ ExpectBlocksLine ─line─▶ ExpectTrailingStatus
//!                              ▲                                                  │
//!                              └──────────────────── blank ───────────────────────┘
//! any state ─"unused devices"─▶ Done
//! ```
//!
//! An array start line opens a new block from any state after the header.

use tracing::{debug, trace};

use crate::error::{Element, MdstatError, Result};
use crate::models::RaidLevel;

const HEADER_LABEL:   &str = "Personalities";
const UNUSED_MARKER:  &str = "unused devices";
const NAME_SEPARATOR: &str = " : ";

/// One line of the source, trimmed, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text:   String,
}

/// The lines belonging to one array, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayBlock {
    pub lines: Vec<SourceLine>,
}

impl ArrayBlock {
    /// Build a block from bare lines, numbering them from 1.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines.into_iter()
            .enumerate()
            .map(|(i, l)| SourceLine { number: i + 1, text: l.as_ref().trim().to_string() })
            .collect();
        Self { lines }
    }

    /// Line number of the block's first line (0 for an empty block).
    pub fn first_line(&self) -> usize {
        self.lines.first().map(|l| l.number).unwrap_or(0)
    }
}

/// Output of segmentation: the declared personalities and the raw array blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    pub personalities: Vec<RaidLevel>,
    pub blocks:        Vec<ArrayBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    ExpectHeader,
    /// Between blocks: only an array start line is meaningful here.
    ExpectArrayStart,
    ExpectBlocksLine,
    ExpectTrailingStatus,
    Done,
}

/// Line-at-a-time segmenter; `segment_lines` drives it over a whole document.
#[derive(Debug)]
pub struct Segmenter {
    state:         SegmentState,
    personalities: Vec<RaidLevel>,
    blocks:        Vec<ArrayBlock>,
}

impl Default for Segmenter {
    fn default() -> Self { Self::new() }
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            state:         SegmentState::ExpectHeader,
            personalities: Vec::new(),
            blocks:        Vec::new(),
        }
    }

    pub fn state(&self) -> SegmentState { self.state }

    /// Feed one raw line with its 1-based number.
    pub fn feed(&mut self, number: usize, raw: &str) -> Result<()> {
        let line = raw.trim();

        if self.state == SegmentState::Done {
            return Ok(());
        }

        if self.state == SegmentState::ExpectHeader {
            if !line.is_empty() {
                self.personalities = parse_personalities(line, number)?;
                self.state = SegmentState::ExpectArrayStart;
            }
            return Ok(());
        }

        if line.contains(UNUSED_MARKER) {
            trace!(line = number, "reached unused devices marker");
            self.state = SegmentState::Done;
            return Ok(());
        }

        if let Some(name) = array_start_name(line) {
            trace!(line = number, array = name, "array block starts");
            self.blocks.push(ArrayBlock {
                lines: vec![SourceLine { number, text: line.to_string() }],
            });
            self.state = SegmentState::ExpectBlocksLine;
            return Ok(());
        }

        self.state = match (self.state, line.is_empty()) {
            (SegmentState::ExpectArrayStart, true) => SegmentState::ExpectArrayStart,
            (SegmentState::ExpectArrayStart, false) => {
                debug!(line = number, text = line, "ignoring line outside any array block");
                SegmentState::ExpectArrayStart
            }
            (SegmentState::ExpectBlocksLine, true) => SegmentState::ExpectBlocksLine,
            (SegmentState::ExpectTrailingStatus, true) => SegmentState::ExpectArrayStart,
            (state, false) => {
                if let Some(block) = self.blocks.last_mut() {
                    block.lines.push(SourceLine { number, text: line.to_string() });
                }
                match state {
                    SegmentState::ExpectBlocksLine => SegmentState::ExpectTrailingStatus,
                    other => other,
                }
            }
            (other, true) => other,
        };
        Ok(())
    }

    /// Finish segmentation. Fails if no header line was ever seen.
    pub fn finish(self) -> Result<Segments> {
        if self.state == SegmentState::ExpectHeader {
            return Err(MdstatError::format(Element::Header, 1, "missing personalities header"));
        }
        Ok(Segments { personalities: self.personalities, blocks: self.blocks })
    }
}

/// Segment a full status document.
pub fn segment_lines(text: &str) -> Result<Segments> {
    let mut segmenter = Segmenter::new();
    for (idx, line) in text.lines().enumerate() {
        segmenter.feed(idx + 1, line)?;
        if segmenter.state() == SegmentState::Done {
            break;
        }
    }
    segmenter.finish()
}

/// Decode `Personalities : [raid1] [raid6]` into levels, in declared order.
pub fn parse_personalities(line: &str, number: usize) -> Result<Vec<RaidLevel>> {
    let rest = line.trim()
        .strip_prefix(HEADER_LABEL)
        .map(str::trim_start)
        .and_then(|r| r.strip_prefix(':'))
        .ok_or_else(|| MdstatError::format(
            Element::Header, number, format!("expected `{} :` label", HEADER_LABEL),
        ))?;

    Ok(rest.split_whitespace()
        .map(|t| t.trim_matches(|c| c == '[' || c == ']'))
        .filter(|t| !t.is_empty())
        .map(RaidLevel::from)
        .collect())
}

/// Returns the array name if `line` opens an array block (`md0 : active ...`).
pub fn array_start_name(line: &str) -> Option<&str> {
    let (left, _) = line.split_once(NAME_SEPARATOR)?;
    let name = left.trim();
    is_array_name(name).then_some(name)
}

/// Kernel md device names: `md` followed by digits, or `md_<name>`.
fn is_array_name(name: &str) -> bool {
    match name.strip_prefix("md") {
        Some(rest) => !rest.is_empty()
            && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ARRAYS: &str = "\
Personalities : [raid1] [raid6] [raid5] [raid4]
md1 : active raid1 sdb1[1] sda1[0]
      1048512 blocks super 1.2 [2/2] [UU]
      bitmap: 0/1 pages [0KB], 65536KB chunk

md0 : active raid5 sdc[2] sdb[1] sda[0]
      3906764800 blocks super 1.2 level 5, 512k chunk, algorithm 2 [3/3] [UUU]

unused devices: <none>
";

    #[test]
    fn header_in_declared_order() {
        let levels = parse_personalities("Personalities : [raid1] [raid6]", 1).unwrap();
        assert_eq!(levels, vec![RaidLevel::Raid1, RaidLevel::Raid6]);
    }

    #[test]
    fn header_without_levels_is_empty() {
        assert!(parse_personalities("Personalities : ", 1).unwrap().is_empty());
    }

    #[test]
    fn header_label_is_required() {
        let err = parse_personalities("md0 : active raid1 sda1[0]", 3).unwrap_err();
        match err {
            MdstatError::Format { element, line, .. } => {
                assert_eq!(element, Element::Header);
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn splits_blocks_and_keeps_line_numbers() {
        let seg = segment_lines(TWO_ARRAYS).unwrap();
        assert_eq!(seg.personalities.len(), 4);
        assert_eq!(seg.blocks.len(), 2);
        assert_eq!(seg.blocks[0].lines.len(), 3);
        assert_eq!(seg.blocks[0].first_line(), 2);
        assert_eq!(seg.blocks[1].lines.len(), 2);
        assert_eq!(seg.blocks[1].first_line(), 6);
        assert!(seg.blocks[1].lines[1].text.starts_with("3906764800 blocks"));
    }

    #[test]
    fn nothing_after_unused_devices_is_read() {
        let text = "Personalities : [raid1]\nunused devices: <none>\nmd9 : active raid1 sda[0]\n1 blocks\n";
        let seg = segment_lines(text).unwrap();
        assert!(seg.blocks.is_empty());
    }

    #[test]
    fn start_line_closes_short_block() {
        let text = "Personalities : [raid1]\nmd0 : active raid1 sda[0]\nmd1 : active raid1 sdb[0]\n      10 blocks super 1.2 [1/1] [U]\n";
        let seg = segment_lines(text).unwrap();
        assert_eq!(seg.blocks.len(), 2);
        assert_eq!(seg.blocks[0].lines.len(), 1);
        assert_eq!(seg.blocks[1].lines.len(), 2);
    }

    #[test]
    fn stray_lines_between_blocks_are_ignored() {
        let text = "Personalities : [raid1]\nread_ahead 1024 sectors\nmd0 : active raid1 sda[0]\n      10 blocks [1/1] [U]\n";
        let seg = segment_lines(text).unwrap();
        assert_eq!(seg.blocks.len(), 1);
        assert_eq!(seg.blocks[0].lines.len(), 2);
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(
            segment_lines("\n\n"),
            Err(MdstatError::Format { element: Element::Header, .. })
        ));
    }

    #[test]
    fn state_transitions() {
        let mut s = Segmenter::new();
        assert_eq!(s.state(), SegmentState::ExpectHeader);
        s.feed(1, "Personalities : [raid1]").unwrap();
        assert_eq!(s.state(), SegmentState::ExpectArrayStart);
        s.feed(2, "md0 : active raid1 sda[0]").unwrap();
        assert_eq!(s.state(), SegmentState::ExpectBlocksLine);
        s.feed(3, "").unwrap();
        assert_eq!(s.state(), SegmentState::ExpectBlocksLine);
        s.feed(4, "   10 blocks [1/1] [U]").unwrap();
        assert_eq!(s.state(), SegmentState::ExpectTrailingStatus);
        s.feed(5, "").unwrap();
        assert_eq!(s.state(), SegmentState::ExpectArrayStart);
        s.feed(6, "unused devices: <none>").unwrap();
        assert_eq!(s.state(), SegmentState::Done);
    }

    #[test]
    fn array_names() {
        assert_eq!(array_start_name("md127 : inactive sdb[0](S)"), Some("md127"));
        assert_eq!(array_start_name("md_home : active raid1 sda[0]"), Some("md_home"));
        assert_eq!(array_start_name("md : active"), None);
        assert_eq!(array_start_name("bitmap: 0/1 pages"), None);
        assert_eq!(array_start_name("sda : active"), None);
    }
}
