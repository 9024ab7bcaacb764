use std::fmt;

/// Filesystem type as reported in the partition listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsType {
    Btrfs,
    Ext4,
    Fat16,
    Fat32,
    LinuxSwap,
    Other(String),
}

impl FsType {
    /// Classifies a listing field; an empty field means no filesystem.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(match value.to_ascii_lowercase().as_str() {
            "btrfs" => FsType::Btrfs,
            "ext4" => FsType::Ext4,
            "fat16" => FsType::Fat16,
            "fat32" => FsType::Fat32,
            "linux-swap" | "linux-swap(v1)" => FsType::LinuxSwap,
            other => FsType::Other(other.to_string()),
        })
    }

    /// Whether the filesystem can carry incremental snapshots.
    pub fn supports_snapshots(&self) -> bool {
        matches!(self, FsType::Btrfs)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FsType::Btrfs => "btrfs",
            FsType::Ext4 => "ext4",
            FsType::Fat16 => "fat16",
            FsType::Fat32 => "fat32",
            FsType::LinuxSwap => "linux-swap",
            FsType::Other(name) => name,
        }
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
