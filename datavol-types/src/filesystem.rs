//! Filesystem types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Filesystems the reconcilers know how to create and grow.
///
/// Only ext4 is supported; anything else found on a target volume is
/// reported rather than resized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemKind {
    #[default]
    Ext4,
}

impl FilesystemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ext4 => "ext4",
        }
    }

    /// Whether a type string reported by blkid names this filesystem
    pub fn matches(self, reported: &str) -> bool {
        reported.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for FilesystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilesystemKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ext4" => Ok(Self::Ext4),
            other => Err(format!("unsupported filesystem type: {other}")),
        }
    }
}
