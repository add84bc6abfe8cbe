use serde::{Deserialize, Serialize};

use crate::models::array::{Array, RaidLevel};

/// One point-in-time read of the status file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub personalities: Vec<RaidLevel>,
    pub arrays:        Vec<Array>,
}

impl Snapshot {
    pub fn array(&self, name: &str) -> Option<&Array> {
        self.arrays.iter().find(|a| a.name == name)
    }
}
