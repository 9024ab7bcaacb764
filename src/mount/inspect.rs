use std::fs;
use std::path::Path;

use crate::error::{MirrorError, Result};

fn read_mounts() -> Result<String> {
    fs::read_to_string("/proc/self/mounts")
        .map_err(|e| MirrorError::message(format!("read /proc/self/mounts: {}", e)))
}

pub fn mountpoint_is_mounted(mountpoint: &Path) -> Result<bool> {
    Ok(mountpoint_listed(&read_mounts()?, mountpoint))
}

fn mountpoint_listed(contents: &str, mountpoint: &Path) -> bool {
    contents.lines().any(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        fields.len() >= 2 && Path::new(fields[1]) == mountpoint
    })
}
