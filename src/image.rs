use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::model::Settings;
use crate::disk::device::partition_path;
use crate::disk::probe::probe_remote;
use crate::disk::DiskGeometry;
use crate::error::{MirrorError, Result};
use crate::mount::guard::LoopGuard;
use crate::mount::ops::remote_remount_readonly;
use crate::remote::{shell_join, RemoteShell};
use crate::types::FsUuid;
use crate::util::command::{run_checked, Runner};
use crate::util::policy::StepPolicy;

/// What `prepare_image` found at the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preparation {
    Initialized,
    Reused,
}

/// Makes sure `output` is an image of `device`: creates it when missing,
/// otherwise checks that its length still matches the remote disk.
pub fn prepare_image(
    remote: &dyn RemoteShell,
    runner: &dyn Runner,
    settings: &Settings,
    device: &str,
    output: &Path,
) -> Result<Preparation> {
    match fs::metadata(output) {
        Ok(meta) => {
            let geometry = probe_remote(remote, device)?;
            if meta.len() != geometry.total_size {
                return Err(MirrorError::SizeMismatch {
                    local: meta.len(),
                    remote: geometry.total_size,
                });
            }
            info!(image = %output.display(), size = meta.len(), "reusing existing image");
            Ok(Preparation::Reused)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            println!("Creating initial image...");
            ImageInitializer::new(remote, runner, settings).initialize(device, output)?;
            Ok(Preparation::Initialized)
        }
        Err(err) => Err(MirrorError::message(format!("stat {}: {}", output.display(), err))),
    }
}

/// Path the image is assembled at before it is moved into place.
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("image"));
    name.push(".partial");
    output.with_file_name(name)
}

/// Builds the local image skeleton: a file as large as the remote disk,
/// holding a raw copy of everything before the filesystem partition and a
/// fresh filesystem in that partition carrying the remote filesystem's UUID.
pub struct ImageInitializer<'a> {
    remote: &'a dyn RemoteShell,
    runner: &'a dyn Runner,
    settings: &'a Settings,
}

impl<'a> ImageInitializer<'a> {
    pub fn new(remote: &'a dyn RemoteShell, runner: &'a dyn Runner, settings: &'a Settings) -> Self {
        Self {
            remote,
            runner,
            settings,
        }
    }

    pub fn initialize(&self, device: &str, output: &Path) -> Result<DiskGeometry> {
        let geometry = probe_remote(self.remote, device)?;
        if geometry.partitions.is_empty() {
            return Err(MirrorError::NoPartitions(device.to_string()));
        }
        let fs_partition = geometry
            .filesystem_partition(&self.settings.filesystem)?
            .clone();
        let uuid = read_fs_uuid(self.remote, &partition_path(device, fs_partition.index))?;
        info!(
            device,
            partition = fs_partition.index,
            offset = fs_partition.start,
            uuid = %uuid,
            "initializing image"
        );

        // Keep the partitions being copied from changing underneath dd.
        for part in geometry
            .partitions
            .iter()
            .filter(|p| p.index < fs_partition.index)
        {
            let path = partition_path(device, part.index);
            StepPolicy::BestEffort.apply(
                "remount read-only",
                remote_remount_readonly(self.remote, &path),
            )?;
        }

        let partial = partial_path(output);
        if partial.exists() {
            warn!(path = %partial.display(), "discarding leftover partial image");
        }
        create_sized(&partial, geometry.total_size)?;
        copy_prefix(self.remote, device, &partial, fs_partition.start)?;
        self.create_filesystem(&partial, fs_partition.index, &uuid)?;
        fs::rename(&partial, output).map_err(|e| {
            MirrorError::message(format!(
                "rename {} to {}: {}",
                partial.display(),
                output.display(),
                e
            ))
        })?;
        info!(image = %output.display(), size = geometry.total_size, "image initialized");
        Ok(geometry)
    }

    fn create_filesystem(&self, image: &Path, index: u32, uuid: &FsUuid) -> Result<()> {
        let loop_dev = LoopGuard::attach(self.runner, image, self.settings.loop_device.as_deref())?;
        let partition = loop_dev.partition(index);
        let mkfs = format!("mkfs.{}", self.settings.filesystem);
        run_checked(self.runner, &mkfs, &["--force", "--uuid", uuid.as_str(), &partition])?;
        loop_dev.release()
    }
}

fn read_fs_uuid(remote: &dyn RemoteShell, partition: &str) -> Result<FsUuid> {
    let output = remote.exec(&shell_join(&["blkid", "-o", "value", "-s", "UUID", partition]))?;
    if !output.success() {
        return Err(MirrorError::Identifier(format!(
            "blkid {} failed with exit code {}: {}",
            partition, output.code, output.stderr
        )));
    }
    output
        .stdout
        .parse::<FsUuid>()
        .map_err(|e| MirrorError::Identifier(format!("{}: {}", partition, e)))
}

fn create_sized(path: &Path, size: u64) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| MirrorError::message(format!("create {}: {}", path.display(), e)))?;
    file.set_len(size)
        .map_err(|e| MirrorError::message(format!("truncate {}: {}", path.display(), e)))?;
    Ok(())
}

/// Streams the first `length` bytes of the remote `device` to the start of
/// the local image, in order.
fn copy_prefix(remote: &dyn RemoteShell, device: &str, image: &Path, length: u64) -> Result<()> {
    if length == 0 {
        return Ok(());
    }
    let mut file = OpenOptions::new()
        .write(true)
        .open(image)
        .map_err(|e| MirrorError::message(format!("open {}: {}", image.display(), e)))?;
    let input = format!("if={}", device);
    let count = format!("count={}", length);
    let command = shell_join(&["dd", &input, "bs=64K", &count, "iflag=count_bytes", "status=none"]);
    info!(device, bytes = length, "copying raw prefix");
    let copied = remote.stream(&command, &mut file)?;
    if copied != length {
        return Err(MirrorError::ShortCopy {
            expected: length,
            copied,
        });
    }
    file.sync_all()?;
    Ok(())
}
