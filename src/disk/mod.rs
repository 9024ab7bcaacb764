pub mod device;
pub mod fs_type;
pub mod parted;
pub mod probe;

use crate::disk::fs_type::FsType;
use crate::error::{MirrorError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRecord {
    pub index: u32,
    /// Byte offset from the start of the disk.
    pub start: u64,
    pub size: u64,
    pub fs_type: Option<FsType>,
}

/// Partition layout of a disk, re-read from its source on every probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskGeometry {
    pub total_size: u64,
    pub partitions: Vec<PartitionRecord>,
}

impl DiskGeometry {
    pub fn partition(&self, index: u32) -> Option<&PartitionRecord> {
        self.partitions.iter().find(|p| p.index == index)
    }

    /// First partition carrying a filesystem of type `kind`.
    pub fn filesystem_partition(&self, kind: &FsType) -> Result<&PartitionRecord> {
        self.partitions
            .iter()
            .find(|p| p.fs_type.as_ref() == Some(kind))
            .ok_or_else(|| MirrorError::NoFilesystemPartition(kind.to_string()))
    }
}
