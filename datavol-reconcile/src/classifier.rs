// SPDX-License-Identifier: GPL-3.0-only

//! Blankness Classifier
//!
//! The physical-volume check runs first and is authoritative: a PV need not
//! carry a signature blkid reports. The signature probe then catches disks
//! holding any other filesystem or partition table.

use datavol_contracts::{HostAdapters, StorageError};
use datavol_types::{BlockDevice, DiskClass, SignatureProbe};
use tracing::debug;

use crate::error::{ReconcileError, Result};

pub async fn classify(adapters: &HostAdapters, device: &BlockDevice) -> Result<DiskClass> {
    let classification = |source: StorageError| ReconcileError::Classification {
        device: device.path.clone(),
        source,
    };

    let class = match adapters
        .lvm_query
        .physical_volume(&device.path)
        .await
        .map_err(classification)?
    {
        Some(pv) => DiskClass::PhysicalVolume { vg_name: pv.vg_name },
        None => match adapters
            .signatures
            .probe_signature(&device.path)
            .await
            .map_err(classification)?
        {
            SignatureProbe::NoSignature => DiskClass::Blank,
            SignatureProbe::Signature(signature) => DiskClass::Foreign { signature },
        },
    };

    debug!("{} classified as {}", device.path, class.label());
    Ok(class)
}

pub async fn is_blank(adapters: &HostAdapters, device: &BlockDevice) -> Result<bool> {
    Ok(classify(adapters, device).await?.is_blank())
}

/// Blank disks among `candidates`, in candidate order
pub async fn blank_disks(
    adapters: &HostAdapters,
    candidates: &[BlockDevice],
) -> Result<Vec<BlockDevice>> {
    let mut blanks = Vec::new();
    for device in candidates {
        if is_blank(adapters, device).await? {
            blanks.push(device.clone());
        }
    }
    Ok(blanks)
}
