//! LVM (Logical Volume Manager) types
//!
//! Types for physical volumes and the logical volume that backs the
//! data mount point.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical volume identified by its group, its name and its canonical path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalVolumeRef {
    /// Parent volume group name
    pub vg_name: String,

    /// Logical volume name
    pub lv_name: String,

    /// Canonical device path (e.g. "/dev/data_vg/data_lv")
    pub lv_path: String,
}

impl LogicalVolumeRef {
    pub fn new(
        vg_name: impl Into<String>,
        lv_name: impl Into<String>,
        lv_path: impl Into<String>,
    ) -> Self {
        Self {
            vg_name: vg_name.into(),
            lv_name: lv_name.into(),
            lv_path: lv_path.into(),
        }
    }

    /// Conventional path used when LVM does not report one
    pub fn default_path(vg_name: &str, lv_name: &str) -> String {
        format!("/dev/{vg_name}/{lv_name}")
    }

    /// Short form: vg/lv
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.vg_name, self.lv_name)
    }

    /// The device-mapper alias of this volume (e.g. "/dev/mapper/data_vg-data_lv").
    ///
    /// Device-mapper doubles every hyphen inside the group and volume names
    /// so the separating hyphen stays unambiguous.
    pub fn mapper_path(&self) -> String {
        format!(
            "/dev/mapper/{}-{}",
            escape_dm_component(&self.vg_name),
            escape_dm_component(&self.lv_name)
        )
    }

    /// Whether `device` is either spelling of this volume's device
    pub fn matches_device(&self, device: &str) -> bool {
        let device = device.trim();
        device == self.lv_path || device == self.mapper_path()
    }
}

impl fmt::Display for LogicalVolumeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.lv_path)
    }
}

fn escape_dm_component(component: &str) -> String {
    component.replace('-', "--")
}

/// Physical volume information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalVolumeInfo {
    /// Device path (e.g., "/dev/nvme1n1")
    pub device: String,

    /// Volume group name (None if not assigned)
    pub vg_name: Option<String>,

    /// Total size in bytes
    pub size: u64,

    /// Free space in bytes
    pub free: u64,
}

impl PhysicalVolumeInfo {
    /// Check if this PV is assigned to a VG
    pub fn is_assigned(&self) -> bool {
        self.vg_name.is_some()
    }

    pub fn belongs_to(&self, vg_name: &str) -> bool {
        self.vg_name.as_deref() == Some(vg_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_and_mapper_paths_are_equivalent() {
        let lv = LogicalVolumeRef::new("data_vg", "data_lv", "/dev/data_vg/data_lv");
        assert!(lv.matches_device("/dev/data_vg/data_lv"));
        assert!(lv.matches_device("/dev/mapper/data_vg-data_lv"));
        assert!(!lv.matches_device("/dev/mapper/data_vg-other"));
    }

    #[test]
    fn mapper_alias_doubles_hyphens() {
        let lv = LogicalVolumeRef::new("my-vg", "lv-1", "/dev/my-vg/lv-1");
        assert_eq!(lv.mapper_path(), "/dev/mapper/my--vg-lv--1");
        assert!(!lv.matches_device("/dev/mapper/my-vg-lv-1"));
    }

    #[test]
    fn unassigned_pv_belongs_nowhere() {
        let pv = PhysicalVolumeInfo {
            device: "/dev/sdb".to_string(),
            vg_name: None,
            size: 100,
            free: 100,
        };
        assert!(!pv.is_assigned());
        assert!(!pv.belongs_to("data_vg"));
    }
}
