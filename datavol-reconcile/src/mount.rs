// SPDX-License-Identifier: GPL-3.0-only

//! Mount binding: mount point directory, persisted entry keyed by UUID, live mount.

use datavol_contracts::HostAdapters;
use datavol_types::{FstabEntry, LogicalVolumeRef, ReconcileConfig};
use tracing::{debug, error, info, warn};

use crate::error::{ReconcileError, Result, StepExt};

/// Makes `volume` durably mounted at the configured mount point.
///
/// Every step verifies before it acts, so re-running against a bound volume
/// changes nothing.
pub async fn ensure_mount_binding(
    adapters: &HostAdapters,
    config: &ReconcileConfig,
    volume: &LogicalVolumeRef,
) -> Result<()> {
    let mount_point = config.mount_point.as_str();
    let device = volume.lv_path.as_str();

    adapters
        .mounts
        .ensure_mount_point(mount_point)
        .await
        .step(|| format!("create mount point {mount_point}"))?;

    let uuid = adapters
        .signatures
        .filesystem_uuid(device)
        .await
        .step(|| format!("read filesystem UUID of {device}"))?
        .ok_or_else(|| ReconcileError::MissingFilesystemUuid {
            device: device.to_string(),
        })?;

    let entries = adapters
        .mounts
        .list_mount_entries()
        .await
        .step(|| "read mount configuration".to_string())?;

    match entries.iter().find(|entry| entry.targets(mount_point)) {
        Some(existing) if existing.uuid() == Some(uuid) => {
            debug!("Mount entry for {mount_point} already present");
        }
        Some(existing) => {
            warn!(
                "Keeping existing mount entry for {mount_point} ({}), filesystem UUID of {device} is {uuid}",
                existing.spec
            );
        }
        None => {
            let entry = FstabEntry::for_uuid(
                uuid,
                mount_point,
                config.fs_type.as_str(),
                &config.mount_options,
            );
            adapters
                .mounts
                .persist_mount_entry(&entry)
                .await
                .step(|| format!("persist mount entry for {mount_point}"))?;
            info!("Persisted mount entry {} -> {mount_point}", entry.spec);
        }
    }

    adapters
        .mounts
        .mount(mount_point)
        .await
        .step(|| format!("mount {mount_point}"))?;

    // A kept entry or an earlier mount may point somewhere else.
    let source = adapters
        .mounts
        .resolve_mount_source(mount_point)
        .await
        .step(|| format!("resolve mount source of {mount_point}"))?;
    match source {
        Some(source) if volume.matches_device(&source) => {
            info!("{volume} mounted at {mount_point}");
            Ok(())
        }
        other => {
            let found = other.unwrap_or_else(|| "nothing".to_string());
            error!("{mount_point} is mounted from {found}, expected {volume}");
            Err(ReconcileError::MountedElsewhere {
                mount_point: mount_point.to_string(),
                expected: volume.clone(),
                found,
            })
        }
    }
}
