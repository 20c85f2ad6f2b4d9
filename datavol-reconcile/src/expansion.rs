// SPDX-License-Identifier: GPL-3.0-only

//! Expansion Reconciler
//!
//! Absorbs newly attached blank disks into the volume group behind the mount
//! point, then grows the logical volume and its filesystem in place.

use datavol_contracts::HostAdapters;
use datavol_types::{BlockDevice, DiskClass, ExpansionOutcome, LogicalVolumeRef, ReconcileConfig};
use tracing::{error, info, warn};

use crate::classifier::classify;
use crate::enumerator::candidate_disks;
use crate::error::{ReconcileError, Result, StepExt};
use crate::inspector::Inspector;

pub struct ExpansionReconciler<'a> {
    adapters: &'a HostAdapters,
    config: &'a ReconcileConfig,
}

impl<'a> ExpansionReconciler<'a> {
    pub fn new(adapters: &'a HostAdapters, config: &'a ReconcileConfig) -> Self {
        Self { adapters, config }
    }

    /// Absorbs every blank disk, then grows the volume and its filesystem.
    ///
    /// With nothing to absorb the run is a no-op, except when the group still
    /// has free extents and the target is its only logical volume: that is
    /// what a run interrupted between ABSORB and GROW_FS leaves behind, so the
    /// growth is finished. Free space in a group shared with other volumes is
    /// left alone, as it may be deliberately unallocated.
    pub async fn run(&self) -> Result<ExpansionOutcome> {
        let inspector = Inspector::new(self.adapters);
        let mount_point = self.config.mount_point.as_str();

        let Some(source) = inspector.resolve_mount_source(mount_point).await? else {
            info!("Nothing mounted at {mount_point}");
            return Ok(ExpansionOutcome::NotMounted {
                mount_point: mount_point.to_string(),
            });
        };

        let Some(volume) = inspector.resolve_lv_for_device(&source).await? else {
            error!("{source} mounted at {mount_point} is not a known logical volume");
            return Err(ReconcileError::UnresolvedMountSource {
                mount_point: mount_point.to_string(),
                device: source,
            });
        };
        info!("{mount_point} is backed by {volume}");

        let candidates = candidate_disks(self.adapters, self.config).await?;
        let absorbable = self.absorbable_disks(&candidates).await?;

        if absorbable.is_empty() {
            let free = self
                .adapters
                .lvm_query
                .group_free_extents(&volume.vg_name)
                .await
                .step(|| format!("read free extents of {}", volume.vg_name))?;
            if free == 0 {
                info!("No blank disks to absorb into {}", volume.vg_name);
                return Ok(ExpansionOutcome::NothingToAbsorb { volume });
            }
            let siblings = inspector.lvs_in_group(&volume.vg_name).await?;
            if siblings.len() > 1 {
                info!(
                    "No blank disks; leaving {free} free extent(s) of {} unallocated, it holds {} logical volumes",
                    volume.vg_name,
                    siblings.len()
                );
                return Ok(ExpansionOutcome::NothingToAbsorb { volume });
            }
            warn!(
                "No blank disks, but {} has {free} free extent(s) left; resuming growth",
                volume.vg_name
            );
        }

        let mut absorbed = Vec::with_capacity(absorbable.len());
        for device in absorbable {
            self.absorb(&volume, &device).await?;
            absorbed.push(device);
        }

        self.grow(&volume).await?;
        Ok(ExpansionOutcome::Expanded { volume, absorbed })
    }

    /// Blank disks, plus physical volumes an interrupted run left outside any group
    async fn absorbable_disks(&self, candidates: &[BlockDevice]) -> Result<Vec<String>> {
        let mut absorbable = Vec::new();
        for device in candidates {
            match classify(self.adapters, device).await? {
                DiskClass::Blank => absorbable.push(device.path.clone()),
                DiskClass::PhysicalVolume { vg_name: None } => {
                    warn!(
                        "{} is a physical volume outside any group, resuming its absorption",
                        device.path
                    );
                    absorbable.push(device.path.clone());
                }
                DiskClass::PhysicalVolume { .. } | DiskClass::Foreign { .. } => {}
            }
        }
        Ok(absorbable)
    }

    async fn absorb(&self, volume: &LogicalVolumeRef, device: &str) -> Result<()> {
        let vg_name = volume.vg_name.as_str();
        let lvm = &self.adapters.lvm_ops;

        info!("Creating physical volume on {device}");
        lvm.create_physical_volume(device)
            .await
            .step(|| format!("create physical volume on {device}"))?;

        info!("Extending volume group {vg_name} with {device}");
        lvm.extend_volume_group(vg_name, device)
            .await
            .step(|| format!("extend volume group {vg_name} with {device}"))
    }

    async fn grow(&self, volume: &LogicalVolumeRef) -> Result<()> {
        let device = volume.lv_path.as_str();
        let expected = self.config.fs_type;

        info!("Extending {volume} over all free extents");
        self.adapters
            .lvm_ops
            .extend_logical_volume_full_free(device)
            .await
            .step(|| format!("extend logical volume {}", volume.display_name()))?;

        let found = self
            .adapters
            .signatures
            .filesystem_type(device)
            .await
            .step(|| format!("read filesystem type of {device}"))?;

        match found {
            Some(found) if expected.matches(&found) => {
                info!("Growing {expected} filesystem on {device}");
                self.adapters
                    .filesystem_ops
                    .grow_filesystem(device, expected)
                    .await
                    .step(|| format!("grow filesystem on {device}"))
            }
            found => {
                let found = found.unwrap_or_else(|| "no filesystem".to_string());
                error!("{device} carries {found}, cannot grow it as {expected}");
                Err(ReconcileError::UnsupportedFilesystem {
                    device: device.to_string(),
                    found,
                    expected,
                })
            }
        }
    }
}
