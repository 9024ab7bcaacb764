use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{MirrorError, Result};
use crate::util::command::Runner;

/// Inputs for one incremental sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Address of the remote host holding the source volume.
    pub source_address: String,
    /// Where the source filesystem's top level is mounted on that host.
    pub source_path: String,
    pub target: PathBuf,
    pub subvolume: String,
    pub ssh_identity: Option<PathBuf>,
}

impl SyncConfig {
    /// Renders the btrbk configuration for this run.
    pub fn render(&self) -> String {
        let mut text = String::new();
        if let Some(identity) = &self.ssh_identity {
            text.push_str(&format!("ssh_identity {}\n", identity.display()));
        }
        text.push_str(&format!("volume {}:{}\n", self.source_address, self.source_path));
        text.push_str(&format!("  target {}\n", self.target.display()));
        text.push_str(&format!("  subvolume {}\n", self.subvolume));
        text
    }
}

/// An incremental sync engine.
pub trait SyncProvider {
    fn run(&self, config: &SyncConfig) -> Result<()>;
}

/// Runs `btrbk` with a configuration written to `config_path`.
pub struct Btrbk<'a> {
    runner: &'a dyn Runner,
    config_path: PathBuf,
}

impl<'a> Btrbk<'a> {
    pub fn new(runner: &'a dyn Runner, config_path: &Path) -> Self {
        Self {
            runner,
            config_path: config_path.to_path_buf(),
        }
    }
}

impl SyncProvider for Btrbk<'_> {
    fn run(&self, config: &SyncConfig) -> Result<()> {
        write_fresh(&self.config_path, &config.render()).map_err(|e| {
            MirrorError::message(format!("write {}: {}", self.config_path.display(), e))
        })?;
        info!(config = %self.config_path.display(), subvolume = %config.subvolume, "running btrbk");
        let config_arg = self.config_path.to_string_lossy();
        let output = self
            .runner
            .run("btrbk", &["--config", &config_arg, "--format=raw", "run"])?;
        if !output.success() {
            return Err(MirrorError::SyncEngine {
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

/// Writes `contents` to a newly created file at `path`. Whatever was at the
/// path before is unlinked first, and a link planted in between makes the
/// create fail instead of being followed.
fn write_fresh(path: &Path, contents: &str) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(contents.as_bytes())
}
