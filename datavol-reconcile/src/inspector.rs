// SPDX-License-Identifier: GPL-3.0-only

//! Volume-Stack Inspector
//!
//! Maps devices to physical volumes, groups and logical volumes, and mount
//! points to their backing devices. Read-only.

use std::collections::BTreeSet;

use datavol_contracts::HostAdapters;
use datavol_types::{BlockDevice, LogicalVolumeRef};
use tracing::debug;

use crate::error::{ReconcileError, Result, StepExt};

pub struct Inspector<'a> {
    adapters: &'a HostAdapters,
}

impl<'a> Inspector<'a> {
    pub fn new(adapters: &'a HostAdapters) -> Self {
        Self { adapters }
    }

    /// Device currently backing `mount_point`, `None` when nothing is mounted there
    pub async fn resolve_mount_source(&self, mount_point: &str) -> Result<Option<String>> {
        self.adapters
            .mounts
            .resolve_mount_source(mount_point)
            .await
            .step(|| format!("resolve mount source of {mount_point}"))
    }

    /// Logical volume `device` refers to, by canonical path or mapper alias
    pub async fn resolve_lv_for_device(&self, device: &str) -> Result<Option<LogicalVolumeRef>> {
        let volumes = self
            .adapters
            .lvm_query
            .list_all_logical_volumes()
            .await
            .step(|| "list logical volumes".to_string())?;

        Ok(volumes.into_iter().find(|lv| lv.matches_device(device)))
    }

    pub async fn lvs_in_group(&self, vg_name: &str) -> Result<BTreeSet<String>> {
        let names = self
            .adapters
            .lvm_query
            .list_logical_volumes(vg_name)
            .await
            .step(|| format!("list logical volumes of {vg_name}"))?;
        Ok(names.into_iter().collect())
    }

    /// Group owning the physical volume on `device`; `None` when it is not a
    /// physical volume or not in any group yet.
    pub async fn pv_group_of(&self, device: &str) -> Result<Option<String>> {
        self.adapters
            .lvm_query
            .physical_volume_group(device)
            .await
            .step(|| format!("look up volume group of {device}"))
    }

    /// Every logical volume reachable from the candidate disks.
    ///
    /// A group is visited once no matter how many of its physical volumes
    /// appear among the candidates.
    pub async fn existing_volumes(
        &self,
        candidates: &[BlockDevice],
    ) -> Result<Vec<LogicalVolumeRef>> {
        let mut groups = BTreeSet::new();
        for device in candidates {
            if let Some(vg_name) = self.pv_group_of(&device.path).await? {
                debug!("{} belongs to volume group {vg_name}", device.path);
                groups.insert(vg_name);
            }
        }
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let known = self
            .adapters
            .lvm_query
            .list_all_logical_volumes()
            .await
            .step(|| "list logical volumes".to_string())?;

        let mut volumes = BTreeSet::new();
        for vg_name in &groups {
            for lv_name in self.lvs_in_group(vg_name).await? {
                let volume = known
                    .iter()
                    .find(|lv| lv.vg_name == *vg_name && lv.lv_name == lv_name)
                    .cloned()
                    .ok_or_else(|| ReconcileError::LogicalVolumeMissing {
                        vg_name: vg_name.clone(),
                        lv_name: lv_name.clone(),
                    })?;
                volumes.insert(volume);
            }
        }
        Ok(volumes.into_iter().collect())
    }

    /// Looks up the canonical reference of a volume known by name
    pub async fn find_volume(&self, vg_name: &str, lv_name: &str) -> Result<LogicalVolumeRef> {
        self.adapters
            .lvm_query
            .list_all_logical_volumes()
            .await
            .step(|| "list logical volumes".to_string())?
            .into_iter()
            .find(|lv| lv.vg_name == vg_name && lv.lv_name == lv_name)
            .ok_or_else(|| ReconcileError::LogicalVolumeMissing {
                vg_name: vg_name.to_string(),
                lv_name: lv_name.to_string(),
            })
    }
}
