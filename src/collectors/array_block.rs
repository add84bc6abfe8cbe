use tracing::debug;

use crate::collectors::segment::{ArrayBlock, SourceLine};
use crate::collectors::substatus::{self, parse_kib, BITMAP_MARKER};
use crate::error::{Element, MdstatError, Result};
use crate::models::{Array, Device, MemberStatus, RaidLevel, SuperblockVersion};

/// Decode one array's line-group into an `Array`.
///
/// Line 1 is `name : state [(flags)] level dev[idx]...`, line 2 is the
/// blocks/superblock line. Any further lines are bitmap or progress lines,
/// decoded best-effort.
pub fn parse_array_block(block: &ArrayBlock) -> Result<Array> {
    let first = block.lines.first().ok_or_else(|| {
        MdstatError::format(Element::ArrayBlock(String::new()), block.first_line(), "empty array block")
    })?;

    let (name_part, info) = first.text.split_once(':').ok_or_else(|| {
        MdstatError::format(Element::ArrayBlock(String::new()), first.number, "missing `:` after array name")
    })?;
    let name = name_part.trim();
    if name.is_empty() {
        return Err(MdstatError::format(Element::ArrayBlock(String::new()), first.number, "missing array name"));
    }
    let fail = |line: usize, reason: String| MdstatError::format(Element::ArrayBlock(name.to_string()), line, reason);

    if block.lines.len() < 2 {
        return Err(fail(first.number, "incomplete array block: no blocks line".into()));
    }

    // ── Line 1: state, level, members ─────────────────────────────────
    let mut tokens = info.split_whitespace().peekable();
    let state = tokens.next()
        .ok_or_else(|| fail(first.number, "missing array state".into()))?
        .to_string();

    let mut state_flags = Vec::new();
    while let Some(&tok) = tokens.peek() {
        match tok.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            Some(flag) => {
                state_flags.push(flag.to_string());
                tokens.next();
            }
            None => break,
        }
    }

    // Inactive arrays list their members straight after the state.
    let level = match tokens.peek() {
        Some(&tok) if !tok.contains('[') => {
            tokens.next();
            RaidLevel::from(tok)
        }
        Some(_) => RaidLevel::Unknown(String::new()),
        None => return Err(fail(first.number, "missing raid level".into())),
    };

    let mut devices: Vec<Device> = Vec::new();
    for token in tokens {
        let dev = parse_device(token).map_err(|e| e.at_line(first.number))?;
        if devices.iter().any(|d| d.array_index == dev.array_index) {
            return Err(MdstatError::format(
                Element::Device(token.to_string()),
                first.number,
                format!("slot {} already taken in {}", dev.array_index, name),
            ));
        }
        devices.push(dev);
    }
    devices.sort_by_key(|d| d.array_index);

    // ── Line 2: blocks, superblock, chunk, member summary ─────────────
    let second = &block.lines[1];
    let head = second.text.split(',').next().unwrap_or_default();
    let head_tokens: Vec<&str> = head.split_whitespace().collect();

    let blocks_token = head_tokens.first()
        .ok_or_else(|| fail(second.number, "missing block count".into()))?;
    let blocks: u64 = blocks_token.parse()
        .map_err(|_| fail(second.number, format!("block count `{}` is not a number", blocks_token)))?;

    // 0.90 metadata is the one format the kernel prints without a `super` tag.
    let superblock = match head_tokens.iter().position(|t| *t == "super") {
        Some(i) => head_tokens.get(i + 1)
            .ok_or_else(|| fail(second.number, "`super` without a version".into()))?
            .parse::<SuperblockVersion>()
            .map_err(|e| fail(second.number, e))?,
        None => SuperblockVersion::V0_90,
    };

    let chunk_kib = parse_chunk(&second.text);
    let members   = parse_member_status(&second.text);

    // ── Remaining lines: optional status ──────────────────────────────
    let mut bitmap    = None;
    let mut op_status = None;
    for line in &block.lines[2..] {
        if line.text.contains(BITMAP_MARKER) {
            match substatus::parse_bitmap(&line.text) {
                Ok(b)  => bitmap = Some(b),
                Err(e) => soft_gap(name, line, &e),
            }
        }
        if substatus::op_keyword(&line.text).is_some() {
            match substatus::parse_op_status(&line.text) {
                Ok(op) => op_status = Some(op),
                Err(e) => soft_gap(name, line, &e),
            }
        }
    }

    Ok(Array {
        name: name.to_string(),
        state,
        state_flags,
        level,
        devices,
        blocks,
        superblock,
        chunk_kib,
        members,
        bitmap,
        op_status,
    })
}

fn soft_gap(array: &str, line: &SourceLine, err: &MdstatError) {
    debug!(array, line = line.number, text = %line.text, error = %err, "status line not decoded");
}

/// Decode a member token such as `sda1[0]`, `sdb1[1](F)` or `sdc[2](S)`.
pub fn parse_device(token: &str) -> Result<Device> {
    let fail = |reason: String| MdstatError::format(Element::Device(token.to_string()), 1, reason);

    let (identifier, rest) = token.split_once('[')
        .ok_or_else(|| fail("missing `[index]`".into()))?;
    if identifier.is_empty() {
        return Err(fail("missing device name".into()));
    }

    let mut dev = Device {
        identifier:     identifier.to_string(),
        array_index:    0,
        in_use:         true,
        is_failing:     false,
        is_spare:       false,
        write_mostly:   false,
        is_journal:     false,
        is_replacement: false,
    };

    // Role suffixes follow the index, possibly several: `[3](W)(F)`.
    let mut rest = rest;
    while let Some(open) = rest.rfind('(').filter(|_| rest.ends_with(')')) {
        match &rest[open..] {
            "(F)" => dev.is_failing     = true,
            "(S)" => dev.is_spare       = true,
            "(W)" => dev.write_mostly   = true,
            "(J)" => dev.is_journal     = true,
            "(R)" => dev.is_replacement = true,
            other => return Err(fail(format!("unknown role flag `{}`", other))),
        }
        rest = &rest[..open];
    }
    dev.in_use = !dev.is_spare;

    let index = rest.strip_suffix(']')
        .ok_or_else(|| fail("missing closing `]`".into()))?;
    dev.array_index = index.parse()
        .map_err(|_| fail(format!("slot `{}` is not a number", index)))?;

    Ok(dev)
}

fn parse_chunk(line: &str) -> Option<u64> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.windows(2)
        .find(|w| w[1].trim_end_matches(',').starts_with("chunk"))
        .and_then(|w| parse_kib(w[0]))
}

/// Find `[n/m]` and the `[UU_]` slot map that follows it.
fn parse_member_status(line: &str) -> Option<MemberStatus> {
    let mut tokens = line.split_whitespace();
    while let Some(tok) = tokens.next() {
        let Some(inner) = tok.strip_prefix('[').and_then(|t| t.strip_suffix(']')) else { continue };
        let Some((raid, active)) = inner.split_once('/') else { continue };
        let (Ok(raid_disks), Ok(active_disks)) = (raid.parse::<u32>(), active.parse::<u32>()) else { continue };

        let slots = tokens.next()
            .and_then(|t| t.strip_prefix('['))
            .and_then(|t| t.strip_suffix(']'))
            .filter(|s| s.chars().all(|c| c == 'U' || c == '_'))
            .unwrap_or_default()
            .to_string();
        return Some(MemberStatus { raid_disks, active_disks, slots });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OpKind;

    fn block(lines: &[&str]) -> ArrayBlock {
        ArrayBlock::from_lines(lines.iter().copied())
    }

    #[test]
    fn two_line_block() {
        let a = parse_array_block(&block(&[
            "md0 : active raid1 sdb1[1] sda1[0]",
            "      976630336 blocks super 1.2 [2/2] [UU]",
        ])).unwrap();
        assert_eq!(a.name, "md0");
        assert_eq!(a.state, "active");
        assert_eq!(a.level, RaidLevel::Raid1);
        assert_eq!(a.blocks, 976630336);
        assert_eq!(a.superblock, SuperblockVersion::V1_2);
        assert_eq!(a.members, Some(MemberStatus { raid_disks: 2, active_disks: 2, slots: "UU".into() }));
        assert!(a.bitmap.is_none());
        assert!(a.op_status.is_none());
    }

    #[test]
    fn devices_sorted_by_slot() {
        let a = parse_array_block(&block(&[
            "md0 : active raid5 sdc1[2] sda1[0] sdb1[1]",
            "3906764800 blocks super 1.2 level 5, 512k chunk, algorithm 2 [3/3] [UUU]",
        ])).unwrap();
        let ids: Vec<_> = a.devices.iter().map(|d| (d.identifier.as_str(), d.array_index)).collect();
        assert_eq!(ids, vec![("sda1", 0), ("sdb1", 1), ("sdc1", 2)]);
        assert_eq!(a.chunk_kib, Some(512));
    }

    #[test]
    fn failing_device_token() {
        let d = parse_device("sdb1[1](F)").unwrap();
        assert_eq!(d.identifier, "sdb1");
        assert_eq!(d.array_index, 1);
        assert!(d.is_failing);
        assert!(d.in_use);
    }

    #[test]
    fn spare_and_stacked_flags() {
        let spare = parse_device("sdc[2](S)").unwrap();
        assert!(spare.is_spare);
        assert!(!spare.in_use);

        let d = parse_device("nvme0n1p2[3](W)(F)").unwrap();
        assert!(d.write_mostly && d.is_failing);
        assert_eq!(d.array_index, 3);
    }

    #[test]
    fn bad_device_tokens() {
        for token in ["sda1", "[0]", "sda1[x]", "sda1[0", "sda1[0](Q)"] {
            let err = parse_device(token).unwrap_err();
            assert!(matches!(err, MdstatError::Format { element: Element::Device(ref t), .. } if t == token));
        }
    }

    #[test]
    fn duplicate_slot_is_rejected() {
        let err = parse_array_block(&block(&[
            "md0 : active raid1 sda1[0] sdb1[0]",
            "100 blocks super 1.2 [2/2] [UU]",
        ])).unwrap_err();
        assert!(matches!(err, MdstatError::Format { element: Element::Device(_), line: 1, .. }));
    }

    #[test]
    fn one_line_block_is_incomplete() {
        let err = parse_array_block(&block(&["md0 : active raid1 sda1[0]"])).unwrap_err();
        match err {
            MdstatError::Format { element, reason, .. } => {
                assert_eq!(element, Element::ArrayBlock("md0".into()));
                assert!(reason.contains("incomplete"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn malformed_block_count() {
        let err = parse_array_block(&block(&[
            "md0 : active raid1 sda1[0]",
            "12x4 blocks super 1.2 [1/1] [U]",
        ])).unwrap_err();
        assert!(matches!(err, MdstatError::Format { line: 2, .. }));
    }

    #[test]
    fn legacy_superblock_has_no_tag() {
        let a = parse_array_block(&block(&[
            "md1 : active raid1 hdc1[1] hda1[0]",
            "104320 blocks [2/2] [UU]",
        ])).unwrap();
        assert_eq!(a.superblock, SuperblockVersion::V0_90);
    }

    #[test]
    fn unsupported_superblock_is_hard_error() {
        assert!(parse_array_block(&block(&[
            "md0 : active raid1 sda1[0]",
            "100 blocks super 9.9 [1/1] [U]",
        ])).is_err());
    }

    #[test]
    fn inactive_array_without_level() {
        let a = parse_array_block(&block(&[
            "md127 : inactive sdb[0](S)",
            "1953382488 blocks super external:imsm",
        ])).unwrap();
        assert_eq!(a.state, "inactive");
        assert_eq!(a.level, RaidLevel::Unknown(String::new()));
        assert_eq!(a.devices.len(), 1);
        assert_eq!(a.superblock, SuperblockVersion::External("external:imsm".into()));
    }

    #[test]
    fn read_only_flag_and_unknown_level() {
        let a = parse_array_block(&block(&[
            "md2 : active (auto-read-only) linear sdb1[1] sda1[0]",
            "200 blocks super 1.0 64k rounding",
        ])).unwrap();
        assert_eq!(a.state_flags, vec!["auto-read-only".to_string()]);
        assert_eq!(a.level, RaidLevel::Unknown("linear".into()));
        assert_eq!(a.superblock, SuperblockVersion::V1_0);
    }

    #[test]
    fn trailing_status_lines() {
        let a = parse_array_block(&block(&[
            "md0 : active raid1 sdb1[2] sda1[0]",
            "976630336 blocks super 1.2 [2/1] [U_]",
            "[==>..................]  recovery = 12.6% (123060480/976630336) finish=127.5min speed=111491K/sec",
            "bitmap: 2/8 pages [8KB], 65536KB chunk",
        ])).unwrap();
        let op = a.op_status.as_ref().unwrap();
        assert_eq!(op.kind, OpKind::Recovery);
        assert_eq!(op.total_units, 976630336);
        let bm = a.bitmap.as_ref().unwrap();
        assert_eq!((bm.pages_used, bm.pages_total), (2, 8));
        assert!(a.is_degraded());
    }

    #[test]
    fn undecodable_status_is_a_soft_gap() {
        let a = parse_array_block(&block(&[
            "md0 : active raid1 sdb1[1] sda1[0]",
            "976630336 blocks super 1.2 [2/2] [UU]",
            "resync=DELAYED",
            "bitmap: broken",
        ])).unwrap();
        assert!(a.op_status.is_none());
        assert!(a.bitmap.is_none());
        assert_eq!(a.blocks, 976630336);
    }
}
