use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use datavol_contracts::{HostAdapters, StorageError};
use datavol_types::{FstabEntry, LogicalVolumeRef};
use uuid::Uuid;

use crate::ledger::{Mutation, MutationKind};

pub const GIB: u64 = 1 << 30;

/// LVM default physical extent size (4 MiB)
pub const EXTENT_SIZE: u64 = 4 << 20;

#[derive(Debug, Clone)]
pub(crate) struct SimDisk {
    pub name: String,
    pub kind: String,
    pub size: u64,
    pub is_system: bool,
    pub signature: Option<String>,
    pub unreadable: bool,
}

impl SimDisk {
    fn new(path: &str, size: u64) -> Self {
        Self {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            kind: "disk".to_string(),
            size,
            is_system: false,
            signature: None,
            unreadable: false,
        }
    }

    pub fn extents(&self) -> u64 {
        self.size / EXTENT_SIZE
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SimFilesystem {
    pub fs_type: String,
    pub uuid: Uuid,
    pub extents: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct SimVolume {
    pub extents: u64,
    pub filesystem: Option<SimFilesystem>,
}

#[derive(Debug, Default)]
pub(crate) struct HostState {
    pub disks: BTreeMap<String, SimDisk>,
    /// device -> owning group
    pub physical_volumes: BTreeMap<String, Option<String>>,
    pub groups: BTreeSet<String>,
    /// (group, volume) -> volume
    pub volumes: BTreeMap<(String, String), SimVolume>,
    pub directories: BTreeSet<String>,
    pub fstab: Vec<FstabEntry>,
    /// mount point -> source device as findmnt would print it
    pub mounts: BTreeMap<String, String>,
    pub mutations: Vec<Mutation>,
    pub failures: Vec<MutationKind>,
}

impl HostState {
    pub fn group_extents(&self, vg_name: &str) -> u64 {
        self.physical_volumes
            .iter()
            .filter(|(_, vg)| vg.as_deref() == Some(vg_name))
            .filter_map(|(device, _)| self.disks.get(device))
            .map(SimDisk::extents)
            .sum()
    }

    pub fn allocated_extents(&self, vg_name: &str) -> u64 {
        self.volumes
            .iter()
            .filter(|((vg, _), _)| vg == vg_name)
            .map(|(_, volume)| volume.extents)
            .sum()
    }

    pub fn free_extents(&self, vg_name: &str) -> u64 {
        self.group_extents(vg_name)
            .saturating_sub(self.allocated_extents(vg_name))
    }

    pub fn volume_ref(vg_name: &str, lv_name: &str) -> LogicalVolumeRef {
        LogicalVolumeRef::new(
            vg_name,
            lv_name,
            LogicalVolumeRef::default_path(vg_name, lv_name),
        )
    }

    pub fn volume_refs(&self) -> Vec<LogicalVolumeRef> {
        self.volumes
            .keys()
            .map(|(vg, lv)| Self::volume_ref(vg, lv))
            .collect()
    }

    /// Key of the volume `device` names, under either spelling
    pub fn volume_key(&self, device: &str) -> Option<(String, String)> {
        self.volume_refs()
            .into_iter()
            .find(|lv| lv.matches_device(device))
            .map(|lv| (lv.vg_name, lv.lv_name))
    }

    /// Records `mutation` and consumes a matching injected failure, if any
    pub fn record(&mut self, mutation: Mutation) -> Result<(), StorageError> {
        let kind = mutation.kind();
        self.mutations.push(mutation);
        if let Some(index) = self.failures.iter().position(|k| *k == kind) {
            self.failures.remove(index);
            return Err(StorageError::internal(format!(
                "injected failure for {kind:?}"
            )));
        }
        Ok(())
    }
}

/// In-memory host: disks, LVM metadata, filesystems, fstab and live mounts.
///
/// Built with the `with_*` methods, then shared with [`SimulatedHost::into_shared`]
/// and handed to the reconcilers through [`SimulatedHost::adapters`].
#[derive(Debug, Default)]
pub struct SimulatedHost {
    state: Mutex<HostState>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_state(self, change: impl FnOnce(&mut HostState)) -> Self {
        change(&mut self.state());
        self
    }

    pub fn with_disk(self, path: &str, size_gib: u64) -> Self {
        self.with_state(|state| {
            state
                .disks
                .insert(path.to_string(), SimDisk::new(path, size_gib * GIB));
        })
    }

    /// Disk hosting the running system (root, boot or swap somewhere in its tree)
    pub fn with_system_disk(self, path: &str, size_gib: u64) -> Self {
        self.with_state(|state| {
            let mut disk = SimDisk::new(path, size_gib * GIB);
            disk.is_system = true;
            disk.signature = Some("gpt".to_string());
            state.disks.insert(path.to_string(), disk);
        })
    }

    pub fn with_foreign_disk(self, path: &str, signature: &str) -> Self {
        self.with_state(|state| {
            let mut disk = SimDisk::new(path, 10 * GIB);
            disk.signature = Some(signature.to_string());
            state.disks.insert(path.to_string(), disk);
        })
    }

    pub fn with_loop_device(self, path: &str) -> Self {
        self.with_state(|state| {
            let mut disk = SimDisk::new(path, GIB);
            disk.kind = "loop".to_string();
            state.disks.insert(path.to_string(), disk);
        })
    }

    /// Disk whose signature probe fails for a reason other than "nothing found"
    pub fn with_unreadable_disk(self, path: &str) -> Self {
        self.with_state(|state| {
            let mut disk = SimDisk::new(path, 10 * GIB);
            disk.unreadable = true;
            state.disks.insert(path.to_string(), disk);
        })
    }

    /// Turns existing disks into physical volumes of a new group
    pub fn with_volume_group(self, vg_name: &str, devices: &[&str]) -> Self {
        self.with_state(|state| {
            state.groups.insert(vg_name.to_string());
            for device in devices {
                state
                    .physical_volumes
                    .insert(device.to_string(), Some(vg_name.to_string()));
            }
        })
    }

    /// Physical volume left outside any group
    pub fn with_orphan_physical_volume(self, device: &str) -> Self {
        self.with_state(|state| {
            state.physical_volumes.insert(device.to_string(), None);
        })
    }

    /// Volume over every free extent of `vg_name`, carrying a fresh ext4 filesystem
    pub fn with_logical_volume(self, vg_name: &str, lv_name: &str) -> Self {
        self.with_state(|state| {
            let extents = state.free_extents(vg_name);
            state.volumes.insert(
                (vg_name.to_string(), lv_name.to_string()),
                SimVolume {
                    extents,
                    filesystem: Some(SimFilesystem {
                        fs_type: "ext4".to_string(),
                        uuid: Uuid::new_v4(),
                        extents,
                    }),
                },
            );
        })
    }

    /// Volume over every free extent of `vg_name` with no filesystem on it
    pub fn with_empty_logical_volume(self, vg_name: &str, lv_name: &str) -> Self {
        self.with_state(|state| {
            let extents = state.free_extents(vg_name);
            state.volumes.insert(
                (vg_name.to_string(), lv_name.to_string()),
                SimVolume {
                    extents,
                    filesystem: None,
                },
            );
        })
    }

    pub fn with_filesystem(self, vg_name: &str, lv_name: &str, fs_type: &str) -> Self {
        self.with_state(|state| {
            if let Some(volume) = state
                .volumes
                .get_mut(&(vg_name.to_string(), lv_name.to_string()))
                && let Some(filesystem) = volume.filesystem.as_mut()
            {
                filesystem.fs_type = fs_type.to_string();
            }
        })
    }

    /// Mounts the volume, with findmnt reporting it under its mapper alias
    pub fn with_mount(self, mount_point: &str, vg_name: &str, lv_name: &str) -> Self {
        self.with_state(|state| {
            state.directories.insert(mount_point.to_string());
            state.mounts.insert(
                mount_point.to_string(),
                HostState::volume_ref(vg_name, lv_name).mapper_path(),
            );
        })
    }

    /// Mount point backed by something LVM does not know
    pub fn with_raw_mount(self, mount_point: &str, source: &str) -> Self {
        self.with_state(|state| {
            state.directories.insert(mount_point.to_string());
            state
                .mounts
                .insert(mount_point.to_string(), source.to_string());
        })
    }

    pub fn with_fstab_entry(self, entry: FstabEntry) -> Self {
        self.with_state(|state| state.fstab.push(entry))
    }

    /// The next call of `kind` fails after being recorded
    pub fn fail_on(self, kind: MutationKind) -> Self {
        self.with_state(|state| state.failures.push(kind))
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn adapters(self: &Arc<Self>) -> HostAdapters {
        HostAdapters::from_host(Arc::clone(self))
    }

    /// Hot-attaches a blank disk to a running host
    pub fn attach_disk(&self, path: &str, size_gib: u64) {
        self.state()
            .disks
            .insert(path.to_string(), SimDisk::new(path, size_gib * GIB));
    }

    pub fn fail_next(&self, kind: MutationKind) {
        self.state().failures.push(kind);
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.state().mutations.clear();
    }

    /// Storage-changing calls only, leaving out mount bookkeeping
    pub fn storage_mutations(&self) -> Vec<Mutation> {
        self.mutations()
            .into_iter()
            .filter(Mutation::is_storage_change)
            .collect()
    }

    /// device -> owning group
    pub fn physical_volumes(&self) -> BTreeMap<String, Option<String>> {
        self.state().physical_volumes.clone()
    }

    pub fn groups(&self) -> Vec<String> {
        self.state().groups.iter().cloned().collect()
    }

    pub fn volumes(&self) -> Vec<LogicalVolumeRef> {
        self.state().volume_refs()
    }

    pub fn volume_extents(&self, vg_name: &str, lv_name: &str) -> Option<u64> {
        self.state()
            .volumes
            .get(&(vg_name.to_string(), lv_name.to_string()))
            .map(|volume| volume.extents)
    }

    pub fn filesystem_extents(&self, vg_name: &str, lv_name: &str) -> Option<u64> {
        self.state()
            .volumes
            .get(&(vg_name.to_string(), lv_name.to_string()))
            .and_then(|volume| volume.filesystem.as_ref())
            .map(|filesystem| filesystem.extents)
    }

    pub fn volume_uuid(&self, vg_name: &str, lv_name: &str) -> Option<Uuid> {
        self.state()
            .volumes
            .get(&(vg_name.to_string(), lv_name.to_string()))
            .and_then(|volume| volume.filesystem.as_ref())
            .map(|filesystem| filesystem.uuid)
    }

    pub fn fstab(&self) -> Vec<FstabEntry> {
        self.state().fstab.clone()
    }

    pub fn mount_source(&self, mount_point: &str) -> Option<String> {
        self.state().mounts.get(mount_point).cloned()
    }

    pub fn free_extents(&self, vg_name: &str) -> u64 {
        self.state().free_extents(vg_name)
    }
}
