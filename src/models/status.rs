use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MdstatError, Result};

/// Write-intent bitmap state from a `bitmap: U/T pages ...` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    pub pages_used:  u64,
    pub pages_total: u64,
    pub chunk_kib:   Option<u64>,
    pub file:        Option<String>,   // external bitmap file, if any
}

impl Bitmap {
    pub fn use_pct(&self) -> f64 {
        if self.pages_total == 0 { return 0.0; }
        self.pages_used as f64 / self.pages_total as f64 * 100.0
    }
}

/// Kind of background operation the kernel is running on an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Recovery,
    Check,
    Resync,
    Reshape,
}

impl OpKind {
    pub const ALL: [OpKind; 4] = [OpKind::Recovery, OpKind::Check, OpKind::Resync, OpKind::Reshape];

    /// Keyword as printed in the progress line.
    pub fn keyword(&self) -> &'static str {
        match self {
            OpKind::Recovery => "recovery",
            OpKind::Check    => "check",
            OpKind::Resync   => "resync",
            OpKind::Reshape  => "reshape",
        }
    }

    /// Whether the operation is rebuilding redundancy, as opposed to a read-only scrub.
    pub fn is_rebuild(&self) -> bool { !matches!(self, OpKind::Check) }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// An in-progress background operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpStatus {
    pub kind:              OpKind,
    pub progress_units:    u64,
    pub total_units:       u64,
    pub finish_minutes:    Option<f64>,
    pub speed_kib_per_sec: Option<u64>,
}

impl OpStatus {
    pub fn progress_percent(&self) -> Result<f64> {
        if self.total_units == 0 {
            return Err(MdstatError::ZeroTotal);
        }
        Ok(self.progress_units as f64 / self.total_units as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(progress_units: u64, total_units: u64) -> OpStatus {
        OpStatus {
            kind: OpKind::Recovery,
            progress_units,
            total_units,
            finish_minutes: None,
            speed_kib_per_sec: None,
        }
    }

    #[test]
    fn percent_of_quarter() {
        assert_eq!(op(2048, 8192).progress_percent().unwrap(), 25.0);
    }

    #[test]
    fn zero_total_is_an_error() {
        assert!(matches!(op(0, 0).progress_percent(), Err(MdstatError::ZeroTotal)));
    }

    #[test]
    fn bitmap_usage() {
        let b = Bitmap { pages_used: 2, pages_total: 8, chunk_kib: Some(65536), file: None };
        assert_eq!(b.use_pct(), 25.0);
        let empty = Bitmap { pages_used: 0, pages_total: 0, chunk_kib: None, file: None };
        assert_eq!(empty.use_pct(), 0.0);
    }

    #[test]
    fn op_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OpKind::Reshape).unwrap(), "\"reshape\"");
    }
}
