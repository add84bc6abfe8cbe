use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::status::{Bitmap, OpStatus};

/// RAID personality / array level. Levels the kernel may report beyond the
/// common ones (`linear`, `multipath`, ...) are kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RaidLevel {
    Raid0,
    Raid1,
    Raid4,
    Raid5,
    Raid6,
    Raid10,
    Unknown(String),
}

impl RaidLevel {
    pub fn as_str(&self) -> &str {
        match self {
            RaidLevel::Raid0      => "raid0",
            RaidLevel::Raid1      => "raid1",
            RaidLevel::Raid4      => "raid4",
            RaidLevel::Raid5      => "raid5",
            RaidLevel::Raid6      => "raid6",
            RaidLevel::Raid10     => "raid10",
            RaidLevel::Unknown(s) => s,
        }
    }
}

impl From<&str> for RaidLevel {
    fn from(s: &str) -> Self {
        match s {
            "raid0"  => RaidLevel::Raid0,
            "raid1"  => RaidLevel::Raid1,
            "raid4"  => RaidLevel::Raid4,
            "raid5"  => RaidLevel::Raid5,
            "raid6"  => RaidLevel::Raid6,
            "raid10" => RaidLevel::Raid10,
            other    => RaidLevel::Unknown(other.to_string()),
        }
    }
}

impl From<String> for RaidLevel {
    fn from(s: String) -> Self { RaidLevel::from(s.as_str()) }
}

impl From<RaidLevel> for String {
    fn from(level: RaidLevel) -> Self { level.as_str().to_string() }
}

impl fmt::Display for RaidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaidLevel::Unknown(s) if s.is_empty() => write!(f, "unknown"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// On-disk metadata format of an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SuperblockVersion {
    V0_90,
    V1_0,
    V1_1,
    V1_2,
    /// Container-managed metadata, e.g. `external:imsm`.
    External(String),
    NonPersistent,
}

impl SuperblockVersion {
    pub fn as_str(&self) -> &str {
        match self {
            SuperblockVersion::V0_90       => "0.90",
            SuperblockVersion::V1_0        => "1.0",
            SuperblockVersion::V1_1        => "1.1",
            SuperblockVersion::V1_2        => "1.2",
            SuperblockVersion::External(s) => s,
            SuperblockVersion::NonPersistent => "non-persistent",
        }
    }
}

impl FromStr for SuperblockVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0.9" | "0.90" => Ok(SuperblockVersion::V0_90),
            "1.0"          => Ok(SuperblockVersion::V1_0),
            "1.1"          => Ok(SuperblockVersion::V1_1),
            "1.2"          => Ok(SuperblockVersion::V1_2),
            "non-persistent" => Ok(SuperblockVersion::NonPersistent),
            ext if ext.starts_with("external:") => Ok(SuperblockVersion::External(ext.to_string())),
            other => Err(format!("unsupported superblock version `{}`", other)),
        }
    }
}

impl TryFrom<String> for SuperblockVersion {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<SuperblockVersion> for String {
    fn from(v: SuperblockVersion) -> Self { v.as_str().to_string() }
}

impl fmt::Display for SuperblockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member of an array, decoded from a token like `sdb1[1](F)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub identifier:     String,
    pub array_index:    u32,
    /// Best effort: the status file only distinguishes spares, so every
    /// other listed member counts as in use.
    pub in_use:         bool,
    pub is_failing:     bool,
    #[serde(default)]
    pub is_spare:       bool,
    #[serde(default)]
    pub write_mostly:   bool,
    #[serde(default)]
    pub is_journal:     bool,
    #[serde(default)]
    pub is_replacement: bool,
}

/// The `[n/m] [UU_]` member summary on an array's second line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStatus {
    pub raid_disks:   u32,
    pub active_disks: u32,
    pub slots:        String,   // "UU_", one char per slot, '_' = missing
}

impl MemberStatus {
    pub fn is_degraded(&self) -> bool {
        self.active_disks < self.raid_disks || self.slots.contains('_')
    }
}

/// One software RAID array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    pub name:        String,
    pub state:       String,         // "active", "inactive", ...
    #[serde(default)]
    pub state_flags: Vec<String>,    // "auto-read-only", ...
    pub level:       RaidLevel,
    pub devices:     Vec<Device>,    // sorted by array_index
    pub blocks:      u64,            // 1 KiB blocks
    pub superblock:  SuperblockVersion,
    pub chunk_kib:   Option<u64>,
    pub members:     Option<MemberStatus>,
    pub bitmap:      Option<Bitmap>,
    pub op_status:   Option<OpStatus>,
}

impl Array {
    pub fn device(&self, identifier: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.identifier == identifier)
    }

    pub fn device_by_index(&self, idx: u32) -> Option<&Device> {
        self.devices.iter().find(|d| d.array_index == idx)
    }

    pub fn capacity_bytes(&self) -> u64 { self.blocks.saturating_mul(1024) }

    pub fn failing_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|d| d.is_failing)
    }

    pub fn is_active(&self) -> bool { self.state == "active" }

    /// Degraded when the member summary reports a missing slot or any member is faulty.
    pub fn is_degraded(&self) -> bool {
        self.members.as_ref().map(|m| m.is_degraded()).unwrap_or(false)
            || self.devices.iter().any(|d| d.is_failing)
    }
}
