//! Persistent mount configuration types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of the persistent mount table (fstab)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FstabEntry {
    /// How the device is identified (e.g. "UUID=...", "/dev/sdb")
    pub spec: String,
    /// Mount point path
    pub mount_point: String,
    /// Filesystem type (e.g. ext4, auto)
    pub fs_type: String,
    /// Comma separated mount options
    pub options: String,
    /// dump(8) frequency
    pub dump: u32,
    /// fsck pass number
    pub pass: u32,
}

impl FstabEntry {
    /// Entry keyed by filesystem UUID, since device paths move across
    /// reattachment and reboot.
    pub fn for_uuid(uuid: Uuid, mount_point: &str, fs_type: &str, options: &str) -> Self {
        Self {
            spec: format!("UUID={uuid}"),
            mount_point: mount_point.to_string(),
            fs_type: fs_type.to_string(),
            options: options.to_string(),
            dump: 0,
            pass: 2,
        }
    }

    /// UUID the entry is keyed by, if it is keyed by one
    pub fn uuid(&self) -> Option<Uuid> {
        self.spec
            .strip_prefix("UUID=")
            .and_then(|value| Uuid::parse_str(value.trim_matches('"')).ok())
    }

    pub fn targets(&self, mount_point: &str) -> bool {
        self.mount_point.trim_end_matches('/') == mount_point.trim_end_matches('/')
    }
}
