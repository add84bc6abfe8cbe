pub mod array;
pub mod snapshot;
pub mod status;

pub use array::{Array, Device, MemberStatus, RaidLevel, SuperblockVersion};
pub use snapshot::Snapshot;
pub use status::{Bitmap, OpKind, OpStatus};
