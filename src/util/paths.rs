use std::fs;
use std::path::{Component, Path};

use crate::error::{MirrorError, Result};

pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '@')
}

pub fn path_has_parent_dir(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

pub fn ensure_mountpoint(path: &Path) -> Result<()> {
    if path.exists() {
        let meta = fs::metadata(path)
            .map_err(|e| MirrorError::message(format!("stat {}: {}", path.display(), e)))?;
        if !meta.is_dir() {
            return Err(MirrorError::Mount(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(path)
        .map_err(|e| MirrorError::message(format!("create {}: {}", path.display(), e)))
}
