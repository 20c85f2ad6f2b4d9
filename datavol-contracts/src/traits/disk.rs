// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;
use uuid::Uuid;

use datavol_types::{BlockDevice, SignatureProbe};

use crate::StorageError;

#[async_trait]
pub trait DiskQueryAdapter: Send + Sync {
    /// Every top-level block device on the host, unfiltered.
    async fn list_block_devices(&self) -> Result<Vec<BlockDevice>, StorageError>;
}

/// Block-device metadata lookups (blkid-equivalent).
#[async_trait]
pub trait SignatureAdapter: Send + Sync {
    /// Low-level probe for any filesystem or partition-table signature.
    ///
    /// `NoSignature` only when the probe ran and found nothing; a probe that
    /// could not run is an error.
    async fn probe_signature(&self, device: &str) -> Result<SignatureProbe, StorageError>;

    /// Filesystem type on `device`, `None` when there is none.
    async fn filesystem_type(&self, device: &str) -> Result<Option<String>, StorageError>;

    /// Filesystem UUID on `device`, `None` when there is none.
    async fn filesystem_uuid(&self, device: &str) -> Result<Option<Uuid>, StorageError>;
}
