pub mod array_block;
pub mod mdstat;
pub mod segment;
pub mod substatus;
pub mod sysfs;
