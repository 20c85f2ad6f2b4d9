// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;

use datavol_types::{LogicalVolumeRef, PhysicalVolumeInfo};

use crate::StorageError;

#[async_trait]
pub trait LvmQueryAdapter: Send + Sync {
    async fn list_physical_volumes(&self) -> Result<Vec<PhysicalVolumeInfo>, StorageError>;

    /// Names of the logical volumes in `vg_name`.
    async fn list_logical_volumes(&self, vg_name: &str) -> Result<Vec<String>, StorageError>;

    /// Every logical volume on the host with its canonical path.
    async fn list_all_logical_volumes(&self) -> Result<Vec<LogicalVolumeRef>, StorageError>;

    async fn group_exists(&self, vg_name: &str) -> Result<bool, StorageError>;

    /// Unallocated extents left in `vg_name`.
    async fn group_free_extents(&self, vg_name: &str) -> Result<u64, StorageError>;

    async fn physical_volume(
        &self,
        device: &str,
    ) -> Result<Option<PhysicalVolumeInfo>, StorageError> {
        Ok(self
            .list_physical_volumes()
            .await?
            .into_iter()
            .find(|pv| pv.device == device))
    }

    async fn is_registered_physical_volume(&self, device: &str) -> Result<bool, StorageError> {
        Ok(self.physical_volume(device).await?.is_some())
    }

    /// Group owning the physical volume on `device`. `None` for a device that
    /// is not a PV or a PV not yet in any group.
    async fn physical_volume_group(&self, device: &str) -> Result<Option<String>, StorageError> {
        Ok(self.physical_volume(device).await?.and_then(|pv| pv.vg_name))
    }
}

/// Mutating LVM operations.
///
/// Implementations must make each call safe to repeat once its effect is in
/// place, except `create_volume_group` which callers guard with
/// `LvmQueryAdapter::group_exists`.
#[async_trait]
pub trait LvmOpsAdapter: Send + Sync {
    /// No-op when `device` is already a physical volume.
    async fn create_physical_volume(&self, device: &str) -> Result<(), StorageError>;

    async fn create_volume_group(&self, vg_name: &str, device: &str) -> Result<(), StorageError>;

    /// No-op when `device` is already in `vg_name`.
    async fn extend_volume_group(&self, vg_name: &str, device: &str) -> Result<(), StorageError>;

    /// Creates `lv_name` over all free extents. No-op when it already exists.
    async fn create_logical_volume_full_free(
        &self,
        vg_name: &str,
        lv_name: &str,
    ) -> Result<(), StorageError>;

    /// Grows `lv_path` by every free extent in its group. No-op when there are none.
    async fn extend_logical_volume_full_free(&self, lv_path: &str) -> Result<(), StorageError>;
}
