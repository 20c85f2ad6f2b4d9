// SPDX-License-Identifier: GPL-3.0-only

//! Device Enumerator
//!
//! Candidate disks are whole physical disks that do not host the running
//! system. An empty result is a valid "nothing to do" state.

use datavol_contracts::HostAdapters;
use datavol_types::{BlockDevice, ReconcileConfig};
use tracing::debug;

use crate::error::{Result, StepExt};

/// Candidate disks in a deterministic order (sorted by device path)
pub async fn candidate_disks(
    adapters: &HostAdapters,
    config: &ReconcileConfig,
) -> Result<Vec<BlockDevice>> {
    let devices = adapters
        .disks
        .list_block_devices()
        .await
        .step(|| "list block devices".to_string())?;

    let mut candidates: Vec<BlockDevice> = devices
        .into_iter()
        .filter(|device| is_candidate(device, config))
        .collect();
    candidates.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(
        "Candidate disks: [{}]",
        candidates
            .iter()
            .map(|d| d.path.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(candidates)
}

fn is_candidate(device: &BlockDevice, config: &ReconcileConfig) -> bool {
    if !device.is_disk() || device.is_virtual() {
        return false;
    }
    if device.is_system {
        debug!("Skipping {}: hosts the running system", device.path);
        return false;
    }
    if let Some(boot) = config.boot_device.as_deref()
        && (boot == device.path || boot == device.name)
    {
        debug!("Skipping {}: configured boot device", device.path);
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(name: &str) -> BlockDevice {
        BlockDevice {
            name: name.to_string(),
            path: format!("/dev/{name}"),
            kind: "disk".to_string(),
            size: 10 << 30,
            is_system: false,
        }
    }

    #[test]
    fn boot_device_matches_by_path_or_name() {
        let by_path = ReconcileConfig {
            boot_device: Some("/dev/xvda".to_string()),
            ..ReconcileConfig::default()
        };
        let by_name = ReconcileConfig {
            boot_device: Some("xvda".to_string()),
            ..ReconcileConfig::default()
        };
        assert!(!is_candidate(&disk("xvda"), &by_path));
        assert!(!is_candidate(&disk("xvda"), &by_name));
        assert!(is_candidate(&disk("xvdf"), &by_name));
    }

    #[test]
    fn system_and_virtual_devices_are_excluded() {
        let config = ReconcileConfig::default();
        let mut root = disk("nvme0n1");
        root.is_system = true;
        let mut lo = disk("loop3");
        lo.kind = "loop".to_string();

        assert!(!is_candidate(&root, &config));
        assert!(!is_candidate(&lo, &config));
        assert!(!is_candidate(&disk("zram0"), &config));
    }
}
