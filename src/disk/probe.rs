use std::path::Path;

use tracing::debug;

use crate::disk::parted::parse_listing;
use crate::disk::DiskGeometry;
use crate::error::{MirrorError, Result};
use crate::remote::{shell_join, RemoteShell};
use crate::util::command::{render, Runner};

const PARTED: &str = "parted";

fn listing_args(device: &str) -> [&str; 5] {
    ["--machine", device, "unit", "B", "print"]
}

/// Reads the partition geometry of `device` on the remote host.
pub fn probe_remote(remote: &dyn RemoteShell, device: &str) -> Result<DiskGeometry> {
    let mut words = vec![PARTED];
    words.extend(listing_args(device));
    let command = shell_join(&words);
    let output = remote.exec(&command)?;
    if !output.success() {
        return Err(MirrorError::Probe {
            command,
            stderr: output.stderr,
        });
    }
    let geometry = parse_listing(&output.stdout)?;
    debug!(device, size = geometry.total_size, partitions = geometry.partitions.len(), "probed remote");
    Ok(geometry)
}

/// Reads the partition geometry of a local device or image file.
pub fn probe_local(runner: &dyn Runner, path: &Path) -> Result<DiskGeometry> {
    let path = path.to_string_lossy();
    let args = listing_args(&path);
    let output = runner.run(PARTED, &args)?;
    if !output.success() {
        return Err(MirrorError::Probe {
            command: render(PARTED, &args),
            stderr: output.stderr,
        });
    }
    let geometry = parse_listing(&output.stdout)?;
    debug!(path = %path, size = geometry.total_size, partitions = geometry.partitions.len(), "probed local");
    Ok(geometry)
}
