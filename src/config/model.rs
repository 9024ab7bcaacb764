use std::path::PathBuf;

use serde::Deserialize;

use crate::disk::fs_type::FsType;
use crate::types::SubvolumeName;

/// On-disk configuration; every key is optional.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, rename = "loopDevice")]
    pub loop_device: Option<PathBuf>,
    #[serde(default, rename = "localMount")]
    pub local_mount: Option<PathBuf>,
    #[serde(default, rename = "remoteMount")]
    pub remote_mount: Option<String>,
    #[serde(default, rename = "syncConfig")]
    pub sync_config: Option<PathBuf>,
    #[serde(default)]
    pub subvolume: Option<String>,
    #[serde(default)]
    pub filesystem: Option<String>,
    #[serde(default, rename = "topLevelSubvolid")]
    pub top_level_subvolid: Option<u64>,
    #[serde(default, rename = "sshOptions")]
    pub ssh_options: Vec<String>,
    #[serde(default, rename = "sshIdentity")]
    pub ssh_identity: Option<PathBuf>,
}

/// Resolved values shared by the initializer and the backup session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub user: String,
    /// Pinned loop device; `None` lets `losetup --find` pick one.
    pub loop_device: Option<PathBuf>,
    pub local_mount: PathBuf,
    pub remote_mount: String,
    pub sync_config: PathBuf,
    pub subvolume: SubvolumeName,
    pub filesystem: FsType,
    pub top_level_subvolid: u64,
    pub ssh_options: Vec<String>,
    pub ssh_identity: Option<PathBuf>,
}
