use std::fs;
use std::path::Path;
use tracing::debug;

use crate::collectors::array_block::parse_array_block;
use crate::collectors::segment::segment_lines;
use crate::error::{Element, MdstatError, Result};
use crate::models::{Array, Snapshot};

pub const MDSTAT_PATH: &str = "/proc/mdstat";

/// Read and parse /proc/mdstat.
pub fn read_mdstat() -> Result<Snapshot> {
    read_mdstat_from(MDSTAT_PATH)
}

/// Read and parse a status file at `path`. A read failure is returned as-is, never retried.
pub fn read_mdstat_from(path: impl AsRef<Path>) -> Result<Snapshot> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| MdstatError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_mdstat(&content)
}

/// Parse status text into a snapshot. The first malformed array aborts the
/// whole parse; no partial snapshot is returned.
pub fn parse_mdstat(text: &str) -> Result<Snapshot> {
    let segments = segment_lines(text)?;

    let mut arrays: Vec<Array> = Vec::with_capacity(segments.blocks.len());
    for block in &segments.blocks {
        let array = parse_array_block(block)?;
        if arrays.iter().any(|a| a.name == array.name) {
            return Err(MdstatError::format(
                Element::ArrayBlock(array.name),
                block.first_line(),
                "array listed twice",
            ));
        }
        arrays.push(array);
    }

    debug!(arrays = arrays.len(), personalities = segments.personalities.len(), "parsed mdstat");
    Ok(Snapshot { personalities: segments.personalities, arrays })
}
