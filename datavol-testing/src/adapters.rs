use async_trait::async_trait;
use uuid::Uuid;

use datavol_contracts::{
    DiskQueryAdapter, FilesystemOpsAdapter, LvmOpsAdapter, LvmQueryAdapter, MountOpsAdapter,
    SignatureAdapter, StorageError, StorageErrorKind,
};
use datavol_types::{
    BlockDevice, FilesystemKind, FstabEntry, LogicalVolumeRef, PhysicalVolumeInfo, SignatureProbe,
};

use crate::host::{EXTENT_SIZE, HostState, SimFilesystem, SimVolume, SimulatedHost};
use crate::ledger::Mutation;

const PV_SIGNATURE: &str = "LVM2_member";

#[async_trait]
impl DiskQueryAdapter for SimulatedHost {
    async fn list_block_devices(&self) -> Result<Vec<BlockDevice>, StorageError> {
        Ok(self
            .state()
            .disks
            .iter()
            .map(|(path, disk)| BlockDevice {
                name: disk.name.clone(),
                path: path.clone(),
                kind: disk.kind.clone(),
                size: disk.size,
                is_system: disk.is_system,
            })
            .collect())
    }
}

#[async_trait]
impl SignatureAdapter for SimulatedHost {
    async fn probe_signature(&self, device: &str) -> Result<SignatureProbe, StorageError> {
        let state = self.state();
        if let Some(key) = state.volume_key(device) {
            return Ok(state.volumes[&key]
                .filesystem
                .as_ref()
                .map(|fs| SignatureProbe::Signature(fs.fs_type.clone()))
                .unwrap_or(SignatureProbe::NoSignature));
        }

        let disk = state
            .disks
            .get(device)
            .ok_or_else(|| StorageError::not_found(format!("no such device {device}")))?;
        if disk.unreadable {
            return Err(StorageError::new(
                StorageErrorKind::PermissionDenied,
                format!("blkid could not open {device}"),
            ));
        }
        if state.physical_volumes.contains_key(device) {
            return Ok(SignatureProbe::Signature(PV_SIGNATURE.to_string()));
        }
        Ok(disk
            .signature
            .clone()
            .map(SignatureProbe::Signature)
            .unwrap_or(SignatureProbe::NoSignature))
    }

    async fn filesystem_type(&self, device: &str) -> Result<Option<String>, StorageError> {
        let state = self.state();
        if let Some(key) = state.volume_key(device) {
            return Ok(state.volumes[&key]
                .filesystem
                .as_ref()
                .map(|fs| fs.fs_type.clone()));
        }
        if state.physical_volumes.contains_key(device) {
            return Ok(Some(PV_SIGNATURE.to_string()));
        }
        state
            .disks
            .get(device)
            .map(|disk| disk.signature.clone())
            .ok_or_else(|| StorageError::not_found(format!("no such device {device}")))
    }

    async fn filesystem_uuid(&self, device: &str) -> Result<Option<Uuid>, StorageError> {
        let state = self.state();
        if let Some(key) = state.volume_key(device) {
            return Ok(state.volumes[&key].filesystem.as_ref().map(|fs| fs.uuid));
        }
        if state.disks.contains_key(device) {
            return Ok(None);
        }
        Err(StorageError::not_found(format!("no such device {device}")))
    }
}

#[async_trait]
impl LvmQueryAdapter for SimulatedHost {
    async fn list_physical_volumes(&self) -> Result<Vec<PhysicalVolumeInfo>, StorageError> {
        let state = self.state();
        let mut remaining = std::collections::BTreeMap::new();
        let mut pvs = Vec::new();

        // Allocation fills physical volumes in device order.
        for (device, vg_name) in &state.physical_volumes {
            let size = state.disks.get(device).map_or(0, |disk| disk.size);
            let free = match vg_name {
                Some(vg) => {
                    let allocated = remaining
                        .entry(vg.clone())
                        .or_insert_with(|| state.allocated_extents(vg) * EXTENT_SIZE);
                    let used = (*allocated).min(size);
                    *allocated -= used;
                    size - used
                }
                None => size,
            };
            pvs.push(PhysicalVolumeInfo {
                device: device.clone(),
                vg_name: vg_name.clone(),
                size,
                free,
            });
        }
        Ok(pvs)
    }

    async fn list_logical_volumes(&self, vg_name: &str) -> Result<Vec<String>, StorageError> {
        let state = self.state();
        if !state.groups.contains(vg_name) {
            return Err(StorageError::not_found(format!(
                "volume group \"{vg_name}\" not found"
            )));
        }
        Ok(state
            .volumes
            .keys()
            .filter(|(vg, _)| vg == vg_name)
            .map(|(_, lv)| lv.clone())
            .collect())
    }

    async fn list_all_logical_volumes(&self) -> Result<Vec<LogicalVolumeRef>, StorageError> {
        Ok(self.state().volume_refs())
    }

    async fn group_exists(&self, vg_name: &str) -> Result<bool, StorageError> {
        Ok(self.state().groups.contains(vg_name))
    }

    async fn group_free_extents(&self, vg_name: &str) -> Result<u64, StorageError> {
        let state = self.state();
        if !state.groups.contains(vg_name) {
            return Err(StorageError::not_found(format!(
                "volume group \"{vg_name}\" not found"
            )));
        }
        Ok(state.free_extents(vg_name))
    }
}

#[async_trait]
impl LvmOpsAdapter for SimulatedHost {
    async fn create_physical_volume(&self, device: &str) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::CreatePhysicalVolume {
            device: device.to_string(),
        })?;

        if state.physical_volumes.contains_key(device) {
            return Ok(());
        }
        let disk = state
            .disks
            .get(device)
            .ok_or_else(|| StorageError::not_found(format!("no such device {device}")))?;
        if let Some(signature) = &disk.signature {
            return Err(StorageError::conflict(format!(
                "{device} carries a {signature} signature"
            )));
        }
        state.physical_volumes.insert(device.to_string(), None);
        Ok(())
    }

    async fn create_volume_group(&self, vg_name: &str, device: &str) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::CreateVolumeGroup {
            vg_name: vg_name.to_string(),
            device: device.to_string(),
        })?;

        if state.groups.contains(vg_name) {
            return Err(StorageError::conflict(format!(
                "volume group \"{vg_name}\" already exists"
            )));
        }
        match state.physical_volumes.get(device) {
            None => Err(StorageError::not_found(format!(
                "{device} is not a physical volume"
            ))),
            Some(Some(owner)) => Err(StorageError::conflict(format!(
                "{device} already belongs to volume group {owner}"
            ))),
            Some(None) => {
                state.groups.insert(vg_name.to_string());
                state
                    .physical_volumes
                    .insert(device.to_string(), Some(vg_name.to_string()));
                Ok(())
            }
        }
    }

    async fn extend_volume_group(&self, vg_name: &str, device: &str) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::ExtendVolumeGroup {
            vg_name: vg_name.to_string(),
            device: device.to_string(),
        })?;

        if !state.groups.contains(vg_name) {
            return Err(StorageError::not_found(format!(
                "volume group \"{vg_name}\" not found"
            )));
        }
        match state.physical_volumes.get(device) {
            None => Err(StorageError::not_found(format!(
                "{device} is not a physical volume"
            ))),
            Some(Some(owner)) if owner == vg_name => Ok(()),
            Some(Some(owner)) => Err(StorageError::conflict(format!(
                "{device} already belongs to volume group {owner}"
            ))),
            Some(None) => {
                state
                    .physical_volumes
                    .insert(device.to_string(), Some(vg_name.to_string()));
                Ok(())
            }
        }
    }

    async fn create_logical_volume_full_free(
        &self,
        vg_name: &str,
        lv_name: &str,
    ) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::CreateLogicalVolume {
            vg_name: vg_name.to_string(),
            lv_name: lv_name.to_string(),
        })?;

        if !state.groups.contains(vg_name) {
            return Err(StorageError::not_found(format!(
                "volume group \"{vg_name}\" not found"
            )));
        }
        let key = (vg_name.to_string(), lv_name.to_string());
        if state.volumes.contains_key(&key) {
            return Ok(());
        }
        let extents = state.free_extents(vg_name);
        if extents == 0 {
            return Err(StorageError::conflict(format!(
                "volume group \"{vg_name}\" has no free extents"
            )));
        }
        state.volumes.insert(
            key,
            SimVolume {
                extents,
                filesystem: None,
            },
        );
        Ok(())
    }

    async fn extend_logical_volume_full_free(&self, lv_path: &str) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::ExtendLogicalVolume {
            lv_path: lv_path.to_string(),
        })?;

        let key = state
            .volume_key(lv_path)
            .ok_or_else(|| StorageError::not_found(format!("no logical volume at {lv_path}")))?;
        let free = state.free_extents(&key.0);
        if let Some(volume) = state.volumes.get_mut(&key) {
            volume.extents += free;
        }
        Ok(())
    }
}

#[async_trait]
impl FilesystemOpsAdapter for SimulatedHost {
    async fn format_filesystem(
        &self,
        device: &str,
        fs_type: FilesystemKind,
    ) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::FormatFilesystem {
            device: device.to_string(),
            fs_type: fs_type.to_string(),
        })?;

        let volume = volume_mut(state, device)?;
        match &volume.filesystem {
            Some(existing) if fs_type.matches(&existing.fs_type) => Ok(()),
            Some(existing) => Err(StorageError::conflict(format!(
                "{device} already carries {}",
                existing.fs_type
            ))),
            None => {
                volume.filesystem = Some(SimFilesystem {
                    fs_type: fs_type.to_string(),
                    uuid: Uuid::new_v4(),
                    extents: volume.extents,
                });
                Ok(())
            }
        }
    }

    async fn grow_filesystem(
        &self,
        device: &str,
        fs_type: FilesystemKind,
    ) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::GrowFilesystem {
            device: device.to_string(),
        })?;

        let volume = volume_mut(state, device)?;
        let extents = volume.extents;
        match volume.filesystem.as_mut() {
            Some(filesystem) if fs_type.matches(&filesystem.fs_type) => {
                filesystem.extents = extents;
                Ok(())
            }
            _ => Err(StorageError::new(
                StorageErrorKind::Unsupported,
                format!("{device} does not carry {fs_type}"),
            )),
        }
    }
}

fn volume_mut<'s>(
    state: &'s mut HostState,
    device: &str,
) -> Result<&'s mut SimVolume, StorageError> {
    let key = state
        .volume_key(device)
        .ok_or_else(|| StorageError::not_found(format!("no logical volume at {device}")))?;
    state
        .volumes
        .get_mut(&key)
        .ok_or_else(|| StorageError::not_found(format!("no logical volume at {device}")))
}

#[async_trait]
impl MountOpsAdapter for SimulatedHost {
    async fn resolve_mount_source(
        &self,
        mount_point: &str,
    ) -> Result<Option<String>, StorageError> {
        Ok(self.mount_source(mount_point))
    }

    async fn ensure_mount_point(&self, mount_point: &str) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::EnsureMountPoint {
            mount_point: mount_point.to_string(),
        })?;
        state.directories.insert(mount_point.to_string());
        Ok(())
    }

    async fn list_mount_entries(&self) -> Result<Vec<FstabEntry>, StorageError> {
        Ok(self.fstab())
    }

    async fn persist_mount_entry(&self, entry: &FstabEntry) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::PersistMountEntry {
            spec: entry.spec.clone(),
            mount_point: entry.mount_point.clone(),
        })?;

        if !state
            .fstab
            .iter()
            .any(|existing| existing.targets(&entry.mount_point))
        {
            state.fstab.push(entry.clone());
        }
        Ok(())
    }

    async fn mount(&self, mount_point: &str) -> Result<(), StorageError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.record(Mutation::Mount {
            mount_point: mount_point.to_string(),
        })?;

        if state.mounts.contains_key(mount_point) {
            return Ok(());
        }
        if !state.directories.contains(mount_point) {
            return Err(StorageError::not_found(format!(
                "mount point {mount_point} does not exist"
            )));
        }
        let uuid = state
            .fstab
            .iter()
            .find(|entry| entry.targets(mount_point))
            .and_then(FstabEntry::uuid)
            .ok_or_else(|| {
                StorageError::not_found(format!("no fstab entry for {mount_point}"))
            })?;
        let source = state
            .volumes
            .iter()
            .find(|(_, volume)| volume.filesystem.as_ref().is_some_and(|fs| fs.uuid == uuid))
            .map(|((vg, lv), _)| HostState::volume_ref(vg, lv).mapper_path())
            .ok_or_else(|| StorageError::not_found(format!("can't find UUID={uuid}")))?;
        state.mounts.insert(mount_point.to_string(), source);
        Ok(())
    }
}
