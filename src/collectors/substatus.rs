//! Decoders for the optional per-array status lines: the write-intent bitmap
//! and background operation progress. Both are best-effort; callers treat an
//! `Err` as "no data".

use crate::error::{Element, MdstatError, Result};
use crate::models::{Bitmap, OpKind, OpStatus};

pub const BITMAP_MARKER: &str = "bitmap:";

fn line_error(reason: impl Into<String>) -> MdstatError {
    MdstatError::format(Element::StatusLine, 1, reason)
}

/// Decode `bitmap: 3/8 pages [12KB], 65536KB chunk[, file: /path]`.
pub fn parse_bitmap(line: &str) -> Result<Bitmap> {
    let (_, body) = line.split_once(BITMAP_MARKER)
        .ok_or_else(|| line_error("missing `bitmap:` marker"))?;

    let mut pages     = None;
    let mut chunk_kib = None;
    let mut file      = None;

    for segment in body.split(',') {
        let segment = segment.trim();
        if let Some(path) = segment.strip_prefix("file:") {
            file = Some(path.trim().to_string());
            continue;
        }
        let mut words = segment.split_whitespace();
        match (words.next(), words.next()) {
            (Some(figure), Some("pages")) => pages = Some(figure),
            (Some(size),   Some("chunk")) => chunk_kib = parse_kib(size),
            _ => {}
        }
    }

    let figure = pages.ok_or_else(|| line_error("no `pages` figure"))?;
    let (used, total) = figure.split_once('/')
        .ok_or_else(|| line_error(format!("pages figure `{}` is not used/total", figure)))?;
    let pages_used: u64 = used.parse()
        .map_err(|_| line_error(format!("pages used `{}` is not a number", used)))?;
    let pages_total: u64 = total.parse()
        .map_err(|_| line_error(format!("pages total `{}` is not a number", total)))?;
    if pages_used > pages_total {
        return Err(line_error(format!("{} pages used exceeds total {}", pages_used, pages_total)));
    }

    Ok(Bitmap { pages_used, pages_total, chunk_kib, file })
}

/// The operation keyword appearing earliest in `line`, if any.
pub fn op_keyword(line: &str) -> Option<OpKind> {
    OpKind::ALL.iter()
        .filter_map(|k| line.find(k.keyword()).map(|pos| (pos, *k)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, k)| k)
}

/// Decode a progress line such as
/// `[==>......]  recovery = 12.6% (37043392/292945152) finish=127.5min speed=33440K/sec`.
///
/// The `(current/total)` fraction is preferred; when only a percentage is
/// printed it is normalised to per-mille units.
pub fn parse_op_status(line: &str) -> Result<OpStatus> {
    let kind = op_keyword(line).ok_or_else(|| line_error("no operation keyword"))?;

    let (progress_units, total_units) = match progress_fraction(line) {
        Some(f) => f,
        None => {
            let pct = progress_pct(line)
                .ok_or_else(|| line_error(format!("no progress figure for {}", kind)))?;
            ((pct * 10.0).round() as u64, 1000)
        }
    };
    if progress_units > total_units {
        return Err(line_error(format!("progress {} exceeds total {}", progress_units, total_units)));
    }

    let mut finish_minutes    = None;
    let mut speed_kib_per_sec = None;
    for token in line.split_whitespace() {
        if let Some(v) = token.strip_prefix("finish=") {
            finish_minutes = v.trim_end_matches("min").parse().ok();
        }
        if let Some(v) = token.strip_prefix("speed=") {
            speed_kib_per_sec = v.trim_end_matches("/sec").trim_end_matches(|c: char| c == 'K' || c == 'k').parse().ok();
        }
    }

    Ok(OpStatus { kind, progress_units, total_units, finish_minutes, speed_kib_per_sec })
}

fn progress_fraction(line: &str) -> Option<(u64, u64)> {
    line.split_whitespace()
        .filter_map(|t| t.strip_prefix('(').and_then(|t| t.strip_suffix(')')))
        .filter_map(|t| t.split_once('/'))
        .find_map(|(cur, total)| Some((cur.parse().ok()?, total.parse().ok()?)))
}

fn progress_pct(line: &str) -> Option<f64> {
    line.split_whitespace()
        .filter_map(|t| t.trim_start_matches('=').strip_suffix('%'))
        .find_map(|t| t.parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Parse a size like `512k`, `512K`, `65536KB` or `4096B` into KiB.
pub(crate) fn parse_kib(size: &str) -> Option<u64> {
    if let Some(n) = size.strip_suffix("KB") {
        return n.parse().ok();
    }
    if let Some(n) = size.strip_suffix(|c: char| c == 'k' || c == 'K') {
        return n.parse().ok();
    }
    if let Some(n) = size.strip_suffix('B') {
        return n.parse::<u64>().ok().map(|b| b / 1024);
    }
    None
}
