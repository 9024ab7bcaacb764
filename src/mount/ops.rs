use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MirrorError, Result};
use crate::remote::{shell_join, RemoteShell};
use crate::util::command::Runner;
use crate::util::policy::StepPolicy;

pub fn subvolid_options(subvolid: u64) -> String {
    format!("subvolid={}", subvolid)
}

/// Binds `image` to a loop device with partition scanning and returns the
/// device path. A `requested` device is used as-is, otherwise `losetup`
/// picks a free one.
pub fn attach_loop(runner: &dyn Runner, image: &Path, requested: Option<&Path>) -> Result<PathBuf> {
    let image_arg = image.to_string_lossy();
    let output = match requested {
        Some(device) => {
            let device_arg = device.to_string_lossy();
            runner.run("losetup", &[&device_arg, "--partscan", &image_arg])?
        }
        None => runner.run("losetup", &["--find", "--show", "--partscan", &image_arg])?,
    };
    if !output.success() {
        return Err(MirrorError::Mount(format!(
            "losetup {} failed with exit code {}: {}",
            image.display(),
            output.code,
            output.stderr
        )));
    }
    let device = match requested {
        Some(device) => device.to_path_buf(),
        None => {
            let shown = output.stdout.trim();
            if shown.is_empty() {
                return Err(MirrorError::Mount(format!(
                    "losetup {} did not report a device",
                    image.display()
                )));
            }
            PathBuf::from(shown)
        }
    };

    // Partition nodes appear asynchronously after the rescan.
    StepPolicy::BestEffort.apply("udevadm settle", settle(runner))?;
    debug!(image = %image.display(), device = %device.display(), "loop attached");
    Ok(device)
}

fn settle(runner: &dyn Runner) -> Result<()> {
    let output = runner.run("udevadm", &["settle"])?;
    if !output.success() {
        return Err(MirrorError::message(format!("udevadm settle: {}", output.stderr)));
    }
    Ok(())
}

pub fn detach_loop(runner: &dyn Runner, device: &Path) -> Result<()> {
    let device_arg = device.to_string_lossy();
    let output = runner.run("losetup", &["--detach", &device_arg])?;
    if !output.success() {
        return Err(MirrorError::Mount(format!(
            "losetup --detach {} failed with exit code {}: {}",
            device.display(),
            output.code,
            output.stderr
        )));
    }
    Ok(())
}

pub fn mount_device(runner: &dyn Runner, device: &str, mountpoint: &Path, options: &str) -> Result<()> {
    let mountpoint_arg = mountpoint.to_string_lossy();
    let output = runner.run("mount", &[device, "-o", options, &mountpoint_arg])?;
    if !output.success() {
        return Err(MirrorError::Mount(format!(
            "{} on {} failed with exit code {}: {}",
            device,
            mountpoint.display(),
            output.code,
            output.stderr
        )));
    }
    Ok(())
}

pub fn unmount_path(runner: &dyn Runner, mountpoint: &Path) -> Result<()> {
    let mountpoint_arg = mountpoint.to_string_lossy();
    let output = runner.run("umount", &[&mountpoint_arg])?;
    if !output.success() {
        return Err(MirrorError::Mount(format!(
            "umount {} failed with exit code {}: {}",
            mountpoint.display(),
            output.code,
            output.stderr
        )));
    }
    Ok(())
}

pub fn remote_mount(remote: &dyn RemoteShell, device: &str, mountpoint: &str, options: &str) -> Result<()> {
    let command = shell_join(&["mount", device, "-o", options, mountpoint]);
    let output = remote.exec(&command)?;
    if !output.success() {
        return Err(MirrorError::Mount(format!(
            "remote {} on {} failed with exit code {}: {}",
            device, mountpoint, output.code, output.stderr
        )));
    }
    Ok(())
}

pub fn remote_unmount(remote: &dyn RemoteShell, mountpoint: &str) -> Result<()> {
    let output = remote.exec(&shell_join(&["umount", mountpoint]))?;
    if !output.success() {
        return Err(MirrorError::Mount(format!(
            "remote umount {} failed with exit code {}: {}",
            mountpoint, output.code, output.stderr
        )));
    }
    Ok(())
}

pub fn remote_remount_readonly(remote: &dyn RemoteShell, device: &str) -> Result<()> {
    let output = remote.exec(&shell_join(&["mount", "-o", "remount,ro", device]))?;
    if !output.success() {
        return Err(MirrorError::Mount(format!(
            "remote remount,ro {} failed with exit code {}: {}",
            device, output.code, output.stderr
        )));
    }
    Ok(())
}
