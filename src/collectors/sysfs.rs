use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{MdstatError, Result};
use crate::models::Snapshot;

pub const SYSFS_BLOCK_DIR: &str = "/sys/block";

/// Read `/sys/block/<array>/md/mismatch_cnt`.
pub fn read_mismatch_count(array: &str) -> Result<u64> {
    read_mismatch_count_in(Path::new(SYSFS_BLOCK_DIR), array)
}

/// Read `<block_dir>/<array>/md/mismatch_cnt`. The whole file is read and
/// trimmed; an empty file is an error rather than zero.
pub fn read_mismatch_count_in(block_dir: &Path, array: &str) -> Result<u64> {
    if array.is_empty() || array.contains('/') || array == "." || array == ".." {
        return Err(MdstatError::InvalidArrayName(array.to_string()));
    }

    let path = block_dir.join(array).join("md").join("mismatch_cnt");
    let content = fs::read_to_string(&path).map_err(|source| MdstatError::SourceUnavailable {
        path: path.clone(),
        source,
    })?;

    let value = content.trim();
    if value.is_empty() {
        return Err(MdstatError::EmptyValue { path });
    }
    value.parse().map_err(|_| MdstatError::InvalidValue { path: path.clone(), value: value.to_string() })
}

/// Mismatch counts for every array in `snapshot`; arrays whose control file
/// cannot be read are left out.
pub fn mismatch_counts(block_dir: &Path, snapshot: &Snapshot) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for array in &snapshot.arrays {
        match read_mismatch_count_in(block_dir, &array.name) {
            Ok(n)  => { counts.insert(array.name.clone(), n); }
            Err(e) => debug!(array = %array.name, error = %e, "no mismatch count"),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_count(root: &Path, array: &str, content: &str) {
        let dir = root.join(array).join("md");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("mismatch_cnt"), content).unwrap();
    }

    #[test]
    fn reads_and_trims() {
        let tmp = tempfile::tempdir().unwrap();
        write_count(tmp.path(), "md0", "128\n");
        assert_eq!(read_mismatch_count_in(tmp.path(), "md0").unwrap(), 128);
    }

    #[test]
    fn empty_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_count(tmp.path(), "md0", "\n");
        assert!(matches!(read_mismatch_count_in(tmp.path(), "md0"), Err(MdstatError::EmptyValue { .. })));
    }

    #[test]
    fn garbage_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_count(tmp.path(), "md0", "lots");
        assert!(matches!(
            read_mismatch_count_in(tmp.path(), "md0"),
            Err(MdstatError::InvalidValue { ref value, .. }) if value == "lots"
        ));
    }

    #[test]
    fn missing_file_and_bad_names() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(read_mismatch_count_in(tmp.path(), "md9"), Err(MdstatError::SourceUnavailable { .. })));
        assert!(matches!(read_mismatch_count_in(tmp.path(), "../etc"), Err(MdstatError::InvalidArrayName(_))));
        assert!(matches!(read_mismatch_count_in(tmp.path(), ".."), Err(MdstatError::InvalidArrayName(_))));
    }

    #[test]
    fn counts_skip_unreadable_arrays() {
        let tmp = tempfile::tempdir().unwrap();
        write_count(tmp.path(), "md0", "0\n");
        let snap = crate::collectors::mdstat::parse_mdstat(
            "Personalities : [raid1]\nmd0 : active raid1 sda1[0]\n 10 blocks [1/1] [U]\nmd1 : active raid1 sdb1[0]\n 10 blocks [1/1] [U]\n",
        ).unwrap();
        let counts = mismatch_counts(tmp.path(), &snap);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("md0"), Some(&0));
    }
}
