//! Reconciliation configuration
//!
//! Naming conventions for the target volume. There is no config file: the
//! defaults can be overridden through `DATAVOL_*` environment variables.

use serde::{Deserialize, Serialize};

use crate::FilesystemKind;

pub const DEFAULT_VG_NAME: &str = "data_vg";
pub const DEFAULT_LV_NAME: &str = "data_lv";
pub const DEFAULT_MOUNT_POINT: &str = "/data";
pub const DEFAULT_MOUNT_OPTIONS: &str = "defaults,nofail";

pub const ENV_VG_NAME: &str = "DATAVOL_VG_NAME";
pub const ENV_LV_NAME: &str = "DATAVOL_LV_NAME";
pub const ENV_MOUNT_POINT: &str = "DATAVOL_MOUNT_POINT";
pub const ENV_BOOT_DEVICE: &str = "DATAVOL_BOOT_DEVICE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Volume group created on a fresh host
    pub vg_name: String,
    /// Logical volume created on a fresh host
    pub lv_name: String,
    /// Where the data volume is mounted
    pub mount_point: String,
    /// Filesystem created and grown on the logical volume
    pub fs_type: FilesystemKind,
    /// Device never considered a candidate, in addition to detected system disks
    pub boot_device: Option<String>,
    /// Options written into the persisted mount entry
    pub mount_options: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            vg_name: DEFAULT_VG_NAME.to_string(),
            lv_name: DEFAULT_LV_NAME.to_string(),
            mount_point: DEFAULT_MOUNT_POINT.to_string(),
            fs_type: FilesystemKind::default(),
            boot_device: None,
            mount_options: DEFAULT_MOUNT_OPTIONS.to_string(),
        }
    }
}

impl ReconcileConfig {
    /// Defaults overlaid with the `DATAVOL_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns. Blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(vg_name) = value(ENV_VG_NAME) {
            config.vg_name = vg_name;
        }
        if let Some(lv_name) = value(ENV_LV_NAME) {
            config.lv_name = lv_name;
        }
        if let Some(mount_point) = value(ENV_MOUNT_POINT) {
            config.mount_point = mount_point;
        }
        config.boot_device = value(ENV_BOOT_DEVICE);
        config
    }
}
