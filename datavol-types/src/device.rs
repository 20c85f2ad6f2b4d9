//! Block device types
//!
//! Raw disks as reported by the host, and the classification every
//! candidate disk receives before anything is mutated.

use serde::{Deserialize, Serialize};

/// Kernel name prefixes of devices that are never physical disks
const VIRTUAL_NAME_PREFIXES: &[&str] = &["loop", "ram", "zram"];

/// Block device as discovered on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDevice {
    /// Kernel name (e.g. "nvme1n1")
    pub name: String,

    /// Device path (e.g. "/dev/nvme1n1")
    pub path: String,

    /// Device type as reported by lsblk ("disk", "part", "loop", "lvm", ...)
    pub kind: String,

    /// Size in bytes
    pub size: u64,

    /// Whether the running system lives somewhere in this device's tree
    /// (root, boot or swap on the disk or one of its descendants)
    pub is_system: bool,
}

impl BlockDevice {
    /// Whole disk, as opposed to a partition, mapper device or loop device
    pub fn is_disk(&self) -> bool {
        self.kind == "disk"
    }

    /// Loopback and RAM-backed devices
    pub fn is_virtual(&self) -> bool {
        self.kind == "loop"
            || VIRTUAL_NAME_PREFIXES
                .iter()
                .any(|prefix| self.name.starts_with(prefix))
    }
}

/// Outcome of a low-level signature probe on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureProbe {
    /// A filesystem, partition table or other signature was found
    Signature(String),
    /// The probe completed and found nothing
    NoSignature,
}

/// Classification of a candidate disk. Every disk lands in exactly one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "class")]
pub enum DiskClass {
    /// Registered LVM physical volume, optionally already in a group
    PhysicalVolume { vg_name: Option<String> },
    /// No signature and not a physical volume
    Blank,
    /// Carries some other filesystem or partition signature
    Foreign { signature: String },
}

impl DiskClass {
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }

    pub fn is_physical_volume(&self) -> bool {
        matches!(self, Self::PhysicalVolume { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PhysicalVolume { .. } => "physical-volume",
            Self::Blank => "blank",
            Self::Foreign { .. } => "foreign",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, kind: &str) -> BlockDevice {
        BlockDevice {
            name: name.to_string(),
            path: format!("/dev/{name}"),
            kind: kind.to_string(),
            size: 1 << 30,
            is_system: false,
        }
    }

    #[test]
    fn loop_and_ram_devices_are_virtual() {
        assert!(device("loop0", "loop").is_virtual());
        assert!(device("zram0", "disk").is_virtual());
        assert!(!device("nvme1n1", "disk").is_virtual());
    }

    #[test]
    fn partitions_are_not_disks() {
        assert!(device("sda", "disk").is_disk());
        assert!(!device("sda1", "part").is_disk());
    }
}
