// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;

use datavol_types::FilesystemKind;

use crate::StorageError;

#[async_trait]
pub trait FilesystemOpsAdapter: Send + Sync {
    /// No-op when `device` already carries `fs_type`.
    async fn format_filesystem(
        &self,
        device: &str,
        fs_type: FilesystemKind,
    ) -> Result<(), StorageError>;

    /// Grows the filesystem on `device` to fill the device.
    async fn grow_filesystem(&self, device: &str, fs_type: FilesystemKind)
    -> Result<(), StorageError>;
}
