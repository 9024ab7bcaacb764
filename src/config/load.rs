use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::model::{Config, Settings};
use crate::disk::fs_type::FsType;
use crate::error::{ConfigError, MirrorError, Result};
use crate::types::SubvolumeName;
use crate::util::paths::path_has_parent_dir;

pub const DEFAULT_CONFIG_FILE: &str = "/etc/btrmirror.yaml";
const DEFAULT_USER: &str = "root";
const DEFAULT_LOCAL_MOUNT: &str = "/mnt";
const DEFAULT_REMOTE_MOUNT: &str = "/mnt";
const DEFAULT_SYNC_CONFIG: &str = "/tmp/btrbk.conf";
const DEFAULT_SUBVOLUME: &str = "@";
const DEFAULT_TOP_LEVEL_SUBVOLID: u64 = 5;

/// Loads `path`, or the default location when `path` is `None`.
/// Only a missing default file falls back to built-in values.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    let mut contents = String::new();
    match File::open(&path) {
        Ok(mut file) => {
            file.read_to_string(&mut contents)?;
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => {
            return Ok(Config::default());
        }
        Err(err) => {
            return Err(MirrorError::message(format!("open {}: {}", path.display(), err)));
        }
    }
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<Config> {
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config =
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(cfg)
}

pub fn resolve_settings(cfg: Config) -> Result<Settings> {
    let subvolume_raw = cfg.subvolume.unwrap_or_else(|| DEFAULT_SUBVOLUME.to_string());
    let subvolume = subvolume_raw
        .parse::<SubvolumeName>()
        .map_err(ConfigError::Invalid)?;

    let filesystem = match cfg.filesystem.as_deref() {
        None => FsType::Btrfs,
        Some(name) => FsType::parse(name)
            .ok_or_else(|| ConfigError::Invalid("filesystem is empty".to_string()))?,
    };
    if !filesystem.supports_snapshots() {
        return Err(ConfigError::Invalid(format!(
            "filesystem {} does not support snapshots",
            filesystem
        ))
        .into());
    }

    let user = cfg.user.unwrap_or_else(|| DEFAULT_USER.to_string());
    if user.trim().is_empty() {
        return Err(ConfigError::Invalid("user is empty".to_string()).into());
    }

    let local_mount = cfg
        .local_mount
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_MOUNT));
    validate_absolute("localMount", &local_mount)?;
    let remote_mount = cfg
        .remote_mount
        .unwrap_or_else(|| DEFAULT_REMOTE_MOUNT.to_string());
    validate_absolute("remoteMount", Path::new(&remote_mount))?;
    let sync_config = cfg
        .sync_config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SYNC_CONFIG));
    validate_absolute("syncConfig", &sync_config)?;
    if let Some(device) = &cfg.loop_device {
        validate_absolute("loopDevice", device)?;
    }

    Ok(Settings {
        user,
        loop_device: cfg.loop_device,
        local_mount,
        remote_mount,
        sync_config,
        subvolume,
        filesystem,
        top_level_subvolid: cfg.top_level_subvolid.unwrap_or(DEFAULT_TOP_LEVEL_SUBVOLID),
        ssh_options: cfg.ssh_options,
        ssh_identity: cfg.ssh_identity,
    })
}

fn validate_absolute(key: &str, path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(ConfigError::Invalid(format!(
            "{} {} must be absolute",
            key,
            path.display()
        ))
        .into());
    }
    if path_has_parent_dir(path) {
        return Err(ConfigError::Invalid(format!("{} must not contain ..", key)).into());
    }
    Ok(())
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            user: DEFAULT_USER.to_string(),
            loop_device: None,
            local_mount: PathBuf::from(DEFAULT_LOCAL_MOUNT),
            remote_mount: DEFAULT_REMOTE_MOUNT.to_string(),
            sync_config: PathBuf::from(DEFAULT_SYNC_CONFIG),
            subvolume: SubvolumeName::default_root(),
            filesystem: FsType::Btrfs,
            top_level_subvolid: DEFAULT_TOP_LEVEL_SUBVOLID,
            ssh_options: Vec::new(),
            ssh_identity: None,
        }
    }
}
