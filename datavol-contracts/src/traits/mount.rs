// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;

use datavol_types::FstabEntry;

use crate::StorageError;

#[async_trait]
pub trait MountOpsAdapter: Send + Sync {
    /// Device currently mounted at `mount_point`, `None` when nothing is.
    async fn resolve_mount_source(&self, mount_point: &str)
    -> Result<Option<String>, StorageError>;

    /// Creates the mount point directory if missing.
    async fn ensure_mount_point(&self, mount_point: &str) -> Result<(), StorageError>;

    async fn list_mount_entries(&self) -> Result<Vec<FstabEntry>, StorageError>;

    /// Appends `entry` unless an entry for its mount point already exists.
    async fn persist_mount_entry(&self, entry: &FstabEntry) -> Result<(), StorageError>;

    /// Mounts `mount_point` from its persisted entry. Success when already mounted.
    async fn mount(&self, mount_point: &str) -> Result<(), StorageError>;
}
