use std::fmt;
use std::str::FromStr;

use crate::util::paths::is_safe_name;

/// Name of the writable subvolume kept in sync, e.g. `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubvolumeName(String);

impl SubvolumeName {
    /// The conventional root subvolume `@`.
    pub fn default_root() -> Self {
        SubvolumeName("@".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix shared by every snapshot of this subvolume (`@.`).
    pub fn snapshot_prefix(&self) -> String {
        format!("{}.", self.0)
    }
}

impl FromStr for SubvolumeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_safe_name(s) {
            return Err(format!(
                "subvolume {:?} must use only letters, digits, '@', '.', '-', '_'",
                s
            ));
        }
        Ok(SubvolumeName(s.to_string()))
    }
}

impl fmt::Display for SubvolumeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FsUuid(String);

impl FsUuid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FsUuid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("fs-uuid is empty".to_string());
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
            return Err(format!("fs-uuid {:?} is not a uuid", s));
        }
        Ok(FsUuid(s.to_string()))
    }
}

impl fmt::Display for FsUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
