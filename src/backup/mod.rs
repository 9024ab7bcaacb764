use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::backup::btrbk::{SyncConfig, SyncProvider};
use crate::backup::snapshot::select_newest;
use crate::config::model::Settings;
use crate::disk::device::partition_path;
use crate::disk::probe::probe_local;
use crate::error::{MirrorError, Result};
use crate::mount::guard::{LoopGuard, MountGuard, RemoteMountGuard};
use crate::mount::inspect::mountpoint_is_mounted;
use crate::mount::ops::subvolid_options;
use crate::remote::RemoteShell;
use crate::util::command::{run_checked, Runner};
use crate::util::paths::ensure_mountpoint;
use crate::util::policy::StepPolicy;

pub mod btrbk;
pub mod snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Probe,
    Mount,
    Sync,
    Rotate,
    Failed,
    Cleanup,
    Done,
}

/// Everything a session has acquired and must give back.
#[derive(Default)]
struct Resources<'a> {
    loop_dev: Option<LoopGuard<'a>>,
    local_mount: Option<MountGuard<'a>>,
    remote_mount: Option<RemoteMountGuard<'a>>,
}

impl Resources<'_> {
    /// Releases whatever is held. Every step is attempted regardless of the
    /// others, and a failure is logged, never returned.
    fn release(&mut self) {
        if let Some(mount) = self.local_mount.take() {
            let _ = StepPolicy::BestEffort.apply("umount local", mount.release());
        }
        if let Some(loop_dev) = self.loop_dev.take() {
            let _ = StepPolicy::BestEffort.apply("detach loop", loop_dev.release());
        }
        if let Some(mount) = self.remote_mount.take() {
            let _ = StepPolicy::BestEffort.apply("umount remote", mount.release());
        }
    }
}

/// One backup run of `device` into the already initialized `image`.
pub struct BackupSession<'a> {
    remote: &'a dyn RemoteShell,
    runner: &'a dyn Runner,
    sync: &'a dyn SyncProvider,
    settings: &'a Settings,
    device: String,
    image: PathBuf,
    stages: Vec<Stage>,
}

impl<'a> BackupSession<'a> {
    pub fn new(
        remote: &'a dyn RemoteShell,
        runner: &'a dyn Runner,
        sync: &'a dyn SyncProvider,
        settings: &'a Settings,
        device: &str,
        image: &Path,
    ) -> Self {
        Self {
            remote,
            runner,
            sync,
            settings,
            device: device.to_string(),
            image: image.to_path_buf(),
            stages: Vec::new(),
        }
    }

    /// Stages entered so far, in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs probe, mount, sync and rotate, then always cleans up. The first
    /// stage error is returned after cleanup; cleanup errors are only logged.
    pub fn run(&mut self) -> Result<()> {
        let mut resources = Resources::default();
        let outcome = self.run_stages(&mut resources);
        if let Err(err) = &outcome {
            error!(stage = ?self.stages.last(), error = %err, "backup stage failed");
            self.enter(Stage::Failed);
        }
        self.enter(Stage::Cleanup);
        resources.release();
        if outcome.is_ok() {
            self.enter(Stage::Done);
        }
        outcome
    }

    fn enter(&mut self, stage: Stage) {
        info!(?stage, "stage");
        self.stages.push(stage);
    }

    fn run_stages(&mut self, resources: &mut Resources<'a>) -> Result<()> {
        self.enter(Stage::Probe);
        let geometry = probe_local(self.runner, &self.image)?;
        let index = geometry
            .filesystem_partition(&self.settings.filesystem)?
            .index;

        self.enter(Stage::Mount);
        self.mount(index, resources)?;

        self.enter(Stage::Sync);
        self.sync.run(&self.sync_config())?;

        self.enter(Stage::Rotate);
        self.rotate()
    }

    fn mount(&self, index: u32, resources: &mut Resources<'a>) -> Result<()> {
        let mountpoint = &self.settings.local_mount;
        if mountpoint_is_mounted(mountpoint)? {
            return Err(MirrorError::Mount(format!(
                "{} is already in use",
                mountpoint.display()
            )));
        }
        ensure_mountpoint(mountpoint)?;
        let options = subvolid_options(self.settings.top_level_subvolid);

        let loop_dev = resources.loop_dev.insert(LoopGuard::attach(
            self.runner,
            &self.image,
            self.settings.loop_device.as_deref(),
        )?);
        let local_device = loop_dev.partition(index);
        resources.local_mount = Some(MountGuard::mount(
            self.runner,
            &local_device,
            mountpoint,
            &options,
        )?);

        let remote_device = partition_path(&self.device, index);
        resources.remote_mount = Some(RemoteMountGuard::mount(
            self.remote,
            &remote_device,
            &self.settings.remote_mount,
            &options,
        )?);
        info!(local = %local_device, remote = %remote_device, "filesystems mounted");
        Ok(())
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            source_address: self.remote.address().to_string(),
            source_path: self.settings.remote_mount.clone(),
            target: self.settings.local_mount.clone(),
            subvolume: self.settings.subvolume.to_string(),
            ssh_identity: self.settings.ssh_identity.clone(),
        }
    }

    /// Replaces the writable subvolume with a fresh snapshot of the newest
    /// received one and makes it the default subvolume.
    fn rotate(&self) -> Result<()> {
        let mountpoint = &self.settings.local_mount;
        let mountpoint_arg = mountpoint.to_string_lossy();
        let subvolume = &self.settings.subvolume;
        let active = mountpoint.join(subvolume.as_str());
        let active_arg = active.to_string_lossy();

        // The default subvolume cannot be deleted; point the default back at
        // the top level first.
        let top_level = self.settings.top_level_subvolid.to_string();
        StepPolicy::BestEffort.apply(
            "reset default subvolume",
            run_checked(
                self.runner,
                "btrfs",
                &["subvolume", "set-default", &top_level, &mountpoint_arg],
            ),
        )?;
        StepPolicy::BestEffort.apply(
            "delete writable subvolume",
            run_checked(self.runner, "btrfs", &["subvolume", "delete", &active_arg]),
        )?;
        if active.exists() {
            return Err(MirrorError::message(format!(
                "{} still exists; refusing to snapshot over it",
                active.display()
            )));
        }

        let listing = StepPolicy::Fatal
            .apply(
                "list subvolumes",
                run_checked(self.runner, "btrfs", &["subvolume", "list", &mountpoint_arg]),
            )?
            .map(|output| output.stdout)
            .unwrap_or_default();
        let newest = select_newest(listing.lines(), &subvolume.snapshot_prefix())
            .ok_or_else(|| MirrorError::NoSnapshot(subvolume.to_string()))?;
        let source = mountpoint.join(&newest);
        let source_arg = source.to_string_lossy();

        StepPolicy::Fatal.apply(
            "snapshot newest",
            run_checked(
                self.runner,
                "btrfs",
                &["subvolume", "snapshot", &source_arg, &active_arg],
            ),
        )?;
        StepPolicy::Fatal.apply(
            "set default subvolume",
            run_checked(self.runner, "btrfs", &["subvolume", "set-default", &active_arg]),
        )?;
        info!(snapshot = %newest, subvolume = %subvolume, "writable subvolume rotated");
        Ok(())
    }
}
