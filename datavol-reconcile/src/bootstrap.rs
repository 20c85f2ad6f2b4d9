// SPDX-License-Identifier: GPL-3.0-only

//! Bootstrap Reconciler
//!
//! First-time configuration of a host: mount the single existing data volume,
//! or build one on a blank disk. Refuses to act when more than one logical
//! volume is reachable from the candidate disks.

use datavol_contracts::HostAdapters;
use datavol_types::{BlockDevice, BootstrapOutcome, DiskClass, LogicalVolumeRef, ReconcileConfig};
use tracing::{debug, error, info, warn};

use crate::classifier::classify;
use crate::enumerator::candidate_disks;
use crate::error::{ReconcileError, Result, StepExt};
use crate::inspector::Inspector;
use crate::mount::ensure_mount_binding;

pub struct BootstrapReconciler<'a> {
    adapters: &'a HostAdapters,
    config: &'a ReconcileConfig,
}

impl<'a> BootstrapReconciler<'a> {
    pub fn new(adapters: &'a HostAdapters, config: &'a ReconcileConfig) -> Self {
        Self { adapters, config }
    }

    pub async fn run(&self) -> Result<BootstrapOutcome> {
        let candidates = candidate_disks(self.adapters, self.config).await?;
        if candidates.is_empty() {
            info!("No candidate disks found");
            return Ok(BootstrapOutcome::NoCandidates);
        }
        info!("Found {} candidate disk(s)", candidates.len());

        let existing = Inspector::new(self.adapters)
            .existing_volumes(&candidates)
            .await?;

        if existing.len() > 1 {
            error!(
                "{} logical volumes found among candidate disks, refusing to choose",
                existing.len()
            );
            return Err(ReconcileError::AmbiguousTarget {
                candidates: existing,
            });
        }

        match existing.into_iter().next() {
            Some(volume) => {
                info!("Found existing logical volume {volume}, mounting it");
                self.finish_interrupted_format(&volume).await?;
                ensure_mount_binding(self.adapters, self.config, &volume).await?;
                Ok(BootstrapOutcome::MountedExisting { volume })
            }
            None => {
                let device = self.find_target_disk(&candidates).await?;
                let volume = self.init_chain(&device).await?;
                ensure_mount_binding(self.adapters, self.config, &volume).await?;
                Ok(BootstrapOutcome::Initialized {
                    device: device.path,
                    volume,
                })
            }
        }
    }

    /// First blank candidate. Falls back to a physical volume left behind by
    /// an interrupted run: one with no group, or one already in the target group.
    async fn find_target_disk(&self, candidates: &[BlockDevice]) -> Result<BlockDevice> {
        let mut blank = None;
        let mut resumable = None;

        // Every candidate is classified before anything is mutated.
        for device in candidates {
            match classify(self.adapters, device).await? {
                DiskClass::Blank => {
                    blank.get_or_insert(device);
                }
                DiskClass::PhysicalVolume { vg_name }
                    if vg_name
                        .as_deref()
                        .is_none_or(|vg| vg == self.config.vg_name) =>
                {
                    resumable.get_or_insert(device);
                }
                DiskClass::PhysicalVolume { .. } => {}
                DiskClass::Foreign { signature } => {
                    debug!("Skipping {}: carries {signature}", device.path);
                }
            }
        }

        if let Some(device) = blank {
            info!("Selected blank disk {}", device.path);
            return Ok(device.clone());
        }
        if let Some(device) = resumable {
            warn!(
                "No blank disk, resuming initialization on physical volume {}",
                device.path
            );
            return Ok(device.clone());
        }

        error!("No blank disk to initialize");
        Err(ReconcileError::NoBlankDisk {
            candidates: candidates.iter().map(|d| d.path.clone()).collect(),
        })
    }

    /// Formats the configured volume when a previous run created it but
    /// stopped before the filesystem was made. Volumes under other names are
    /// never formatted.
    async fn finish_interrupted_format(&self, volume: &LogicalVolumeRef) -> Result<()> {
        if volume.vg_name != self.config.vg_name || volume.lv_name != self.config.lv_name {
            return Ok(());
        }

        let device = volume.lv_path.as_str();
        let found = self
            .adapters
            .signatures
            .filesystem_type(device)
            .await
            .step(|| format!("read filesystem type of {device}"))?;
        if found.is_some() {
            return Ok(());
        }

        warn!("{volume} has no filesystem, resuming initialization");
        self.format(volume).await
    }

    async fn format(&self, volume: &LogicalVolumeRef) -> Result<()> {
        info!("Formatting {} as {}", volume.lv_path, self.config.fs_type);
        self.adapters
            .filesystem_ops
            .format_filesystem(&volume.lv_path, self.config.fs_type)
            .await
            .step(|| format!("format {} as {}", volume.lv_path, self.config.fs_type))
    }

    async fn init_chain(&self, device: &BlockDevice) -> Result<LogicalVolumeRef> {
        let path = device.path.as_str();
        let vg_name = self.config.vg_name.as_str();
        let lv_name = self.config.lv_name.as_str();
        let lvm = &self.adapters.lvm_ops;

        info!("Creating physical volume on {path}");
        lvm.create_physical_volume(path)
            .await
            .step(|| format!("create physical volume on {path}"))?;

        let group_exists = self
            .adapters
            .lvm_query
            .group_exists(vg_name)
            .await
            .step(|| format!("check volume group {vg_name}"))?;
        if group_exists {
            warn!("Volume group {vg_name} already exists, extending it onto {path}");
            lvm.extend_volume_group(vg_name, path)
                .await
                .step(|| format!("extend volume group {vg_name} with {path}"))?;
        } else {
            info!("Creating volume group {vg_name} on {path}");
            lvm.create_volume_group(vg_name, path)
                .await
                .step(|| format!("create volume group {vg_name} on {path}"))?;
        }

        info!("Creating logical volume {vg_name}/{lv_name} over all free space");
        lvm.create_logical_volume_full_free(vg_name, lv_name)
            .await
            .step(|| format!("create logical volume {vg_name}/{lv_name}"))?;

        let volume = Inspector::new(self.adapters)
            .find_volume(vg_name, lv_name)
            .await?;

        self.format(&volume).await?;
        Ok(volume)
    }
}
