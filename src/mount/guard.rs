//! Release guards for the resources a run acquires. Each guard releases
//! at most once: explicitly through `release`, or from `Drop` if the
//! owner never got that far.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::disk::device::partition_path;
use crate::error::Result;
use crate::mount::ops::{attach_loop, detach_loop, mount_device, remote_mount, remote_unmount, unmount_path};
use crate::remote::RemoteShell;
use crate::util::command::Runner;

pub struct LoopGuard<'a> {
    runner: &'a dyn Runner,
    device: PathBuf,
    attached: bool,
}

impl<'a> LoopGuard<'a> {
    pub fn attach(runner: &'a dyn Runner, image: &Path, requested: Option<&Path>) -> Result<Self> {
        let device = attach_loop(runner, image, requested)?;
        Ok(Self {
            runner,
            device,
            attached: true,
        })
    }

    pub fn partition(&self, index: u32) -> String {
        partition_path(&self.device.to_string_lossy(), index)
    }

    pub fn release(mut self) -> Result<()> {
        self.attached = false;
        detach_loop(self.runner, &self.device)
    }
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        if self.attached {
            if let Err(err) = detach_loop(self.runner, &self.device) {
                warn!(device = %self.device.display(), error = %err, "loop detach failed");
            }
        }
    }
}

pub struct MountGuard<'a> {
    runner: &'a dyn Runner,
    mountpoint: PathBuf,
    mounted: bool,
}

impl<'a> MountGuard<'a> {
    pub fn mount(runner: &'a dyn Runner, device: &str, mountpoint: &Path, options: &str) -> Result<Self> {
        mount_device(runner, device, mountpoint, options)?;
        Ok(Self {
            runner,
            mountpoint: mountpoint.to_path_buf(),
            mounted: true,
        })
    }

    pub fn release(mut self) -> Result<()> {
        self.mounted = false;
        unmount_path(self.runner, &self.mountpoint)
    }
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        if self.mounted {
            if let Err(err) = unmount_path(self.runner, &self.mountpoint) {
                warn!(mountpoint = %self.mountpoint.display(), error = %err, "umount failed");
            }
        }
    }
}

pub struct RemoteMountGuard<'a> {
    remote: &'a dyn RemoteShell,
    mountpoint: String,
    mounted: bool,
}

impl<'a> RemoteMountGuard<'a> {
    pub fn mount(remote: &'a dyn RemoteShell, device: &str, mountpoint: &str, options: &str) -> Result<Self> {
        remote_mount(remote, device, mountpoint, options)?;
        Ok(Self {
            remote,
            mountpoint: mountpoint.to_string(),
            mounted: true,
        })
    }

    pub fn release(mut self) -> Result<()> {
        self.mounted = false;
        remote_unmount(self.remote, &self.mountpoint)
    }
}

impl Drop for RemoteMountGuard<'_> {
    fn drop(&mut self) {
        if self.mounted {
            if let Err(err) = remote_unmount(self.remote, &self.mountpoint) {
                warn!(mountpoint = %self.mountpoint, error = %err, "remote umount failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRemote, FakeRunner};

    #[test]
    fn release_runs_once() {
        let runner = FakeRunner::new().respond("losetup --find", "/dev/loop4\n");
        let guard = LoopGuard::attach(&runner, Path::new("/srv/pi.img"), None).expect("attach");
        assert_eq!(guard.partition(2), "/dev/loop4p2");
        guard.release().expect("detach");
        assert_eq!(runner.count("losetup --detach /dev/loop4"), 1);
    }

    #[test]
    fn drop_releases_forgotten_guards() {
        let runner = FakeRunner::new();
        let remote = FakeRemote::new();
        {
            let _mount = MountGuard::mount(&runner, "/dev/loop0p2", Path::new("/mnt"), "subvolid=5")
                .expect("mount");
            let _remote = RemoteMountGuard::mount(&remote, "/dev/sda2", "/mnt", "subvolid=5")
                .expect("remote mount");
        }
        assert_eq!(runner.count("umount /mnt"), 1);
        assert_eq!(remote.count("umount /mnt"), 1);
    }
}
