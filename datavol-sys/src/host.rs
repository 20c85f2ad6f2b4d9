// SPDX-License-Identifier: GPL-3.0-only

//! Command-backed implementation of every host capability
//!
//! Each mutating call first checks whether its effect is already in place and
//! skips the tool invocation if so, which makes a repeated reconciliation run
//! safe after a partial failure.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use datavol_contracts::{
    DiskQueryAdapter, FilesystemOpsAdapter, HostAdapters, LvmOpsAdapter, LvmQueryAdapter,
    MountOpsAdapter, SignatureAdapter, StorageError, StorageErrorKind,
};
use datavol_types::{
    BlockDevice, FilesystemKind, FstabEntry, LogicalVolumeRef, PhysicalVolumeInfo, SignatureProbe,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::runner::{CommandRunner, CommandSpec, SshRunner, run_checked};
use crate::{blkid, fs_tools, lsblk, lvm_tools, mounts};

/// Host whose capabilities are backed by command-line tools run through `R`
pub struct CommandHost<R> {
    runner: R,
}

impl<R: CommandRunner> CommandHost<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn checked(&self, spec: CommandSpec) -> Result<String, StorageError> {
        run_checked(&self.runner, &spec)
            .await
            .map_err(StorageError::from)
    }

    fn require_lvm(&self) -> Result<(), StorageError> {
        if !cfg!(feature = "lvm-tools") {
            return Err(StorageError::new(
                StorageErrorKind::Unsupported,
                "LVM unavailable: compile-time feature disabled",
            ));
        }
        Ok(())
    }

    async fn tag(&self, device: &str, tag: &str) -> Result<Option<String>, StorageError> {
        let spec = blkid::tag_command(device, tag);
        let output = self.runner.run(&spec).await?;
        Ok(blkid::interpret_tag(&spec, &output)?)
    }
}

/// Adapters that reach the target host over ssh
pub fn build_ssh_adapters(
    identity: &str,
    address: &str,
    credential: impl Into<PathBuf>,
) -> crate::Result<HostAdapters> {
    let runner = SshRunner::new(identity, address, credential)?;
    Ok(HostAdapters::from_host(Arc::new(CommandHost::new(runner))))
}

#[async_trait]
impl<R: CommandRunner + 'static> DiskQueryAdapter for CommandHost<R> {
    async fn list_block_devices(&self) -> Result<Vec<BlockDevice>, StorageError> {
        let stdout = self.checked(lsblk::list_command()).await?;
        let devices = lsblk::parse_lsblk(&stdout)?;
        debug!("Found {} block devices", devices.len());
        Ok(devices)
    }
}

#[async_trait]
impl<R: CommandRunner + 'static> SignatureAdapter for CommandHost<R> {
    async fn probe_signature(&self, device: &str) -> Result<SignatureProbe, StorageError> {
        let spec = blkid::probe_command(device);
        let output = self.runner.run(&spec).await?;
        let probe = blkid::interpret_probe(&spec, &output)?;
        debug!("Signature probe on {device}: {probe:?}");
        Ok(probe)
    }

    async fn filesystem_type(&self, device: &str) -> Result<Option<String>, StorageError> {
        self.tag(device, "TYPE").await
    }

    async fn filesystem_uuid(&self, device: &str) -> Result<Option<Uuid>, StorageError> {
        match self.tag(device, "UUID").await? {
            Some(value) => Ok(Some(blkid::parse_uuid(&value)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<R: CommandRunner + 'static> LvmQueryAdapter for CommandHost<R> {
    async fn list_physical_volumes(&self) -> Result<Vec<PhysicalVolumeInfo>, StorageError> {
        self.require_lvm()?;
        let stdout = self.checked(lvm_tools::pvs_command()).await?;
        Ok(lvm_tools::parse_pvs(&stdout))
    }

    async fn list_logical_volumes(&self, vg_name: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .list_all_logical_volumes()
            .await?
            .into_iter()
            .filter(|lv| lv.vg_name == vg_name)
            .map(|lv| lv.lv_name)
            .collect())
    }

    async fn list_all_logical_volumes(&self) -> Result<Vec<LogicalVolumeRef>, StorageError> {
        self.require_lvm()?;
        let stdout = self.checked(lvm_tools::lvs_command()).await?;
        Ok(lvm_tools::parse_lvs(&stdout))
    }

    async fn group_exists(&self, vg_name: &str) -> Result<bool, StorageError> {
        self.require_lvm()?;
        let stdout = self.checked(lvm_tools::vgs_command()).await?;
        Ok(lvm_tools::parse_vgs(&stdout)
            .iter()
            .any(|vg| vg.name == vg_name))
    }

    async fn group_free_extents(&self, vg_name: &str) -> Result<u64, StorageError> {
        self.require_lvm()?;
        let stdout = self.checked(lvm_tools::vgs_command()).await?;
        lvm_tools::parse_vgs(&stdout)
            .into_iter()
            .find(|vg| vg.name == vg_name)
            .map(|vg| vg.free_extents)
            .ok_or_else(|| StorageError::not_found(format!("volume group {vg_name} not found")))
    }
}

#[async_trait]
impl<R: CommandRunner + 'static> LvmOpsAdapter for CommandHost<R> {
    async fn create_physical_volume(&self, device: &str) -> Result<(), StorageError> {
        if self.is_registered_physical_volume(device).await? {
            debug!("{device} is already a physical volume");
            return Ok(());
        }
        info!("Creating physical volume on {device}");
        self.checked(lvm_tools::pvcreate(device)).await?;
        Ok(())
    }

    async fn create_volume_group(&self, vg_name: &str, device: &str) -> Result<(), StorageError> {
        if self.group_exists(vg_name).await? {
            return Err(StorageError::conflict(format!(
                "volume group {vg_name} already exists"
            )));
        }
        info!("Creating volume group {vg_name} on {device}");
        self.checked(lvm_tools::vgcreate(vg_name, device)).await?;
        Ok(())
    }

    async fn extend_volume_group(&self, vg_name: &str, device: &str) -> Result<(), StorageError> {
        if let Some(pv) = self.physical_volume(device).await?
            && pv.belongs_to(vg_name)
        {
            debug!("{device} is already in volume group {vg_name}");
            return Ok(());
        }
        info!("Extending volume group {vg_name} onto {device}");
        self.checked(lvm_tools::vgextend(vg_name, device)).await?;
        Ok(())
    }

    async fn create_logical_volume_full_free(
        &self,
        vg_name: &str,
        lv_name: &str,
    ) -> Result<(), StorageError> {
        if self
            .list_logical_volumes(vg_name)
            .await?
            .iter()
            .any(|name| name == lv_name)
        {
            debug!("Logical volume {vg_name}/{lv_name} already exists");
            return Ok(());
        }
        info!("Creating logical volume {vg_name}/{lv_name} over all free space");
        self.checked(lvm_tools::lvcreate_full_free(vg_name, lv_name))
            .await?;
        Ok(())
    }

    async fn extend_logical_volume_full_free(&self, lv_path: &str) -> Result<(), StorageError> {
        let volume = self
            .list_all_logical_volumes()
            .await?
            .into_iter()
            .find(|lv| lv.matches_device(lv_path))
            .ok_or_else(|| StorageError::not_found(format!("logical volume {lv_path} not found")))?;

        let free = self.group_free_extents(&volume.vg_name).await?;
        if free == 0 {
            debug!("No free extents in {}, {lv_path} left as is", volume.vg_name);
            return Ok(());
        }
        info!("Extending {lv_path} by {free} free extents");
        self.checked(lvm_tools::lvextend_full_free(lv_path)).await?;
        Ok(())
    }
}

#[async_trait]
impl<R: CommandRunner + 'static> FilesystemOpsAdapter for CommandHost<R> {
    async fn format_filesystem(
        &self,
        device: &str,
        fs_type: FilesystemKind,
    ) -> Result<(), StorageError> {
        match self.filesystem_type(device).await? {
            Some(found) if fs_type.matches(&found) => {
                debug!("{device} already carries {fs_type}");
                return Ok(());
            }
            Some(found) => {
                return Err(StorageError::conflict(format!(
                    "refusing to format {device}: it already carries {found}"
                )));
            }
            None => {}
        }
        info!("Formatting {device} as {fs_type}");
        self.checked(fs_tools::mkfs(device, fs_type)?).await?;
        Ok(())
    }

    async fn grow_filesystem(
        &self,
        device: &str,
        fs_type: FilesystemKind,
    ) -> Result<(), StorageError> {
        info!("Growing {fs_type} filesystem on {device}");
        self.checked(fs_tools::grow(device, fs_type)?).await?;
        Ok(())
    }
}

#[async_trait]
impl<R: CommandRunner + 'static> MountOpsAdapter for CommandHost<R> {
    async fn resolve_mount_source(
        &self,
        mount_point: &str,
    ) -> Result<Option<String>, StorageError> {
        let spec = mounts::findmnt_source(mount_point);
        let output = self.runner.run(&spec).await?;
        Ok(mounts::interpret_findmnt(&spec, &output)?)
    }

    async fn ensure_mount_point(&self, mount_point: &str) -> Result<(), StorageError> {
        self.checked(mounts::mkdir(mount_point)).await?;
        Ok(())
    }

    async fn list_mount_entries(&self) -> Result<Vec<FstabEntry>, StorageError> {
        let stdout = self.checked(mounts::read_fstab()).await?;
        Ok(mounts::parse_fstab(&stdout)?)
    }

    async fn persist_mount_entry(&self, entry: &FstabEntry) -> Result<(), StorageError> {
        if let Some(existing) = self
            .list_mount_entries()
            .await?
            .into_iter()
            .find(|existing| existing.targets(&entry.mount_point))
        {
            debug!(
                "{} already has a mount entry ({}), not adding another",
                entry.mount_point, existing.spec
            );
            return Ok(());
        }
        info!("Adding mount entry {} -> {}", entry.spec, entry.mount_point);
        self.checked(mounts::append_fstab(entry)).await?;
        Ok(())
    }

    async fn mount(&self, mount_point: &str) -> Result<(), StorageError> {
        if let Some(source) = self.resolve_mount_source(mount_point).await? {
            debug!("{mount_point} is already mounted from {source}");
            return Ok(());
        }
        info!("Mounting {mount_point}");
        self.checked(mounts::mount(mount_point)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::runner::testing::ScriptedRunner;

    const LV: &str = "/dev/data_vg/data_lv";

    fn host(runner: ScriptedRunner) -> CommandHost<ScriptedRunner> {
        CommandHost::new(runner)
    }

    #[tokio::test]
    async fn create_physical_volume_skips_registered_device() {
        let host = host(ScriptedRunner::default().on(
            &lvm_tools::pvs_command().render(),
            CommandOutput::ok("  /dev/sdb\tdata_vg\t100\t0\n"),
        ));
        host.create_physical_volume("/dev/sdb").await.unwrap();
        assert!(!host.runner().ran("pvcreate"));
    }

    #[tokio::test]
    async fn create_physical_volume_runs_pvcreate_on_new_device() {
        let host = host(
            ScriptedRunner::default()
                .on(&lvm_tools::pvs_command().render(), CommandOutput::ok(""))
                .on("pvcreate /dev/sdc", CommandOutput::ok("")),
        );
        host.create_physical_volume("/dev/sdc").await.unwrap();
        assert!(host.runner().ran("pvcreate"));
    }

    #[tokio::test]
    async fn extend_volume_group_skips_member() {
        let host = host(ScriptedRunner::default().on(
            &lvm_tools::pvs_command().render(),
            CommandOutput::ok("  /dev/sdc\tdata_vg\t100\t100\n"),
        ));
        host.extend_volume_group("data_vg", "/dev/sdc").await.unwrap();
        assert!(!host.runner().ran("vgextend"));
    }

    #[tokio::test]
    async fn create_volume_group_refuses_existing_group() {
        let host = host(ScriptedRunner::default().on(
            &lvm_tools::vgs_command().render(),
            CommandOutput::ok("  data_vg\t0\n"),
        ));
        let error = host.create_volume_group("data_vg", "/dev/sdb").await.unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::Conflict);
        assert!(!host.runner().ran("vgcreate"));
    }

    #[tokio::test]
    async fn extend_logical_volume_is_noop_without_free_extents() {
        let host = host(
            ScriptedRunner::default()
                .on(
                    &lvm_tools::lvs_command().render(),
                    CommandOutput::ok("  data_vg\tdata_lv\t/dev/data_vg/data_lv\n"),
                )
                .on(
                    &lvm_tools::vgs_command().render(),
                    CommandOutput::ok("  data_vg\t0\n"),
                ),
        );
        host.extend_logical_volume_full_free("/dev/mapper/data_vg-data_lv")
            .await
            .unwrap();
        assert!(!host.runner().ran("lvextend"));
    }

    #[tokio::test]
    async fn format_skips_matching_filesystem_and_refuses_foreign_one() {
        let same = host(ScriptedRunner::default().on(
            &blkid::tag_command(LV, "TYPE").render(),
            CommandOutput::ok("ext4\n"),
        ));
        same.format_filesystem(LV, FilesystemKind::Ext4).await.unwrap();
        assert!(!same.runner().ran("mkfs.ext4"));

        let foreign = host(ScriptedRunner::default().on(
            &blkid::tag_command(LV, "TYPE").render(),
            CommandOutput::ok("xfs\n"),
        ));
        let error = foreign
            .format_filesystem(LV, FilesystemKind::Ext4)
            .await
            .unwrap_err();
        assert!(error.message.contains("xfs"));
        assert!(!foreign.runner().ran("mkfs.ext4"));
    }

    #[tokio::test]
    async fn persist_mount_entry_does_not_duplicate() {
        let entry = FstabEntry::for_uuid(Uuid::new_v4(), "/data", "ext4", "defaults,nofail");
        let host = host(ScriptedRunner::default().on(
            &mounts::read_fstab().render(),
            CommandOutput::ok("UUID=0b6c1a43-8d4e-4b8e-9f6a-2d7c8e9f0a1b /data ext4 defaults 0 2\n"),
        ));
        host.persist_mount_entry(&entry).await.unwrap();
        assert!(!host.runner().ran("tee"));
    }

    #[tokio::test]
    async fn persist_mount_entry_matches_non_ascii_mount_point() {
        let entry = FstabEntry::for_uuid(Uuid::new_v4(), "/dätä", "ext4", "defaults,nofail");
        let host = host(ScriptedRunner::default().on(
            &mounts::read_fstab().render(),
            CommandOutput::ok("UUID=0b6c1a43-8d4e-4b8e-9f6a-2d7c8e9f0a1b /dätä ext4 defaults 0 2\n"),
        ));
        host.persist_mount_entry(&entry).await.unwrap();
        host.persist_mount_entry(&entry).await.unwrap();
        assert!(!host.runner().ran("tee"));
    }

    #[tokio::test]
    async fn persist_mount_entry_appends_uuid_line() {
        let uuid = Uuid::new_v4();
        let entry = FstabEntry::for_uuid(uuid, "/data", "ext4", "defaults,nofail");
        let host = host(
            ScriptedRunner::default()
                .on(&mounts::read_fstab().render(), CommandOutput::ok("# empty\n"))
                .on("tee -a /etc/fstab", CommandOutput::ok("")),
        );
        host.persist_mount_entry(&entry).await.unwrap();

        let calls = host.runner().calls();
        let tee = calls.iter().find(|call| call.program == "tee").unwrap();
        assert_eq!(
            tee.stdin.as_deref(),
            Some(format!("UUID={uuid} /data ext4 defaults,nofail 0 2\n").as_str())
        );
    }

    #[tokio::test]
    async fn mount_is_success_when_already_mounted() {
        let host = host(ScriptedRunner::default().on(
            &mounts::findmnt_source("/data").render(),
            CommandOutput::ok("/dev/mapper/data_vg-data_lv\n"),
        ));
        host.mount("/data").await.unwrap();
        assert!(!host.runner().ran("mount"));
    }

    #[tokio::test]
    async fn probe_failure_is_an_error_not_blank() {
        let host = host(ScriptedRunner::default().on(
            &blkid::probe_command("/dev/sdf").render(),
            CommandOutput::failed(4, "blkid: /dev/sdf: Device or resource busy"),
        ));
        let error = host.probe_signature("/dev/sdf").await.unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::Busy);
    }
}
