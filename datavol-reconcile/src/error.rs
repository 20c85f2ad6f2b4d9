// SPDX-License-Identifier: GPL-3.0-only

use datavol_contracts::StorageError;
use datavol_types::{FilesystemKind, LogicalVolumeRef};
use thiserror::Error;

/// Hard failures of a reconciliation run. No-op terminal states are outcomes, not errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "ambiguous target: {count} logical volumes found among candidate disks ({list}); refusing to choose",
        count = .candidates.len(),
        list = volume_list(.candidates)
    )]
    AmbiguousTarget { candidates: Vec<LogicalVolumeRef> },

    #[error("no blank disk to initialize among candidates: {}", .candidates.join(", "))]
    NoBlankDisk { candidates: Vec<String> },

    #[error("{device} mounted at {mount_point} is not a logical volume known to LVM")]
    UnresolvedMountSource { mount_point: String, device: String },

    #[error("logical volume {vg_name}/{lv_name} is not listed by LVM")]
    LogicalVolumeMissing { vg_name: String, lv_name: String },

    #[error(
        "{device} carries {found}, only {expected} can be grown; the logical volume was extended but the filesystem was not resized"
    )]
    UnsupportedFilesystem {
        device: String,
        found: String,
        expected: FilesystemKind,
    },

    #[error("{mount_point} is mounted from {found}, not from {expected}")]
    MountedElsewhere {
        mount_point: String,
        expected: LogicalVolumeRef,
        found: String,
    },

    #[error("{device} has no filesystem UUID to persist a mount entry for")]
    MissingFilesystemUuid { device: String },

    #[error("could not classify {device}: {source}")]
    Classification {
        device: String,
        #[source]
        source: StorageError,
    },

    #[error("{step} failed: {source}")]
    Storage {
        step: String,
        #[source]
        source: StorageError,
    },
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

fn volume_list(volumes: &[LogicalVolumeRef]) -> String {
    volumes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Names the step a collaborator call belonged to
pub(crate) trait StepExt<T> {
    fn step(self, step: impl FnOnce() -> String) -> Result<T>;
}

impl<T> StepExt<T> for std::result::Result<T, StorageError> {
    fn step(self, step: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|source| ReconcileError::Storage {
            step: step(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguity_reports_every_candidate() {
        let error = ReconcileError::AmbiguousTarget {
            candidates: vec![
                LogicalVolumeRef::new("g1", "lv1", "/dev/g1/lv1"),
                LogicalVolumeRef::new("g2", "lv2", "/dev/g2/lv2"),
            ],
        };
        let message = error.to_string();
        assert!(message.contains("2 logical volumes"));
        assert!(message.contains("g1/lv1 (/dev/g1/lv1)"));
        assert!(message.contains("g2/lv2 (/dev/g2/lv2)"));
    }

    #[test]
    fn step_context_keeps_the_collaborator_error() {
        let result: std::result::Result<(), StorageError> =
            Err(StorageError::internal("pvcreate exited 5"));
        let error = result
            .step(|| "create physical volume on /dev/sdb".to_string())
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "create physical volume on /dev/sdb failed: internal error: pvcreate exited 5"
        );
    }
}
