//! Parser for the Linux software RAID status file (`/proc/mdstat`).
//!
//! [`read_mdstat`] reads the kernel file and returns an immutable
//! [`Snapshot`]; [`parse_mdstat`] does the same for text already in memory.
//! Array mismatch counts live in sysfs and are read separately with
//! [`read_mismatch_count`].

pub mod alerts;
pub mod collectors;
pub mod config;
pub mod error;
pub mod models;
pub mod util;

pub use collectors::mdstat::{parse_mdstat, read_mdstat, read_mdstat_from};
pub use collectors::sysfs::{read_mismatch_count, read_mismatch_count_in};
pub use error::{Element, MdstatError, Result};
pub use models::{Array, Bitmap, Device, OpKind, OpStatus, RaidLevel, Snapshot, SuperblockVersion};
