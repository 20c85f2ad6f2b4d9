//! Terminal states of the reconcilers
//!
//! Hard errors are not outcomes; they surface as errors from the
//! reconciler crate. Everything here exits successfully.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::LogicalVolumeRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum BootstrapOutcome {
    /// No candidate disks on the host
    NoCandidates,
    /// A single pre-existing logical volume was mounted
    MountedExisting { volume: LogicalVolumeRef },
    /// A disk was initialized into a new volume and mounted
    Initialized {
        device: String,
        volume: LogicalVolumeRef,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ExpansionOutcome {
    /// Nothing is mounted at the target mount point
    NotMounted { mount_point: String },
    /// No blank disks and no free space left in the group
    NothingToAbsorb { volume: LogicalVolumeRef },
    /// Disks were absorbed (possibly none, when resuming) and the volume grown
    Expanded {
        volume: LogicalVolumeRef,
        absorbed: Vec<String>,
    },
}

impl fmt::Display for BootstrapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "no candidate disks found, nothing to do"),
            Self::MountedExisting { volume } => {
                write!(f, "mounted existing logical volume {volume}")
            }
            Self::Initialized { device, volume } => {
                write!(f, "initialized {device} as logical volume {volume}")
            }
        }
    }
}

impl fmt::Display for ExpansionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMounted { mount_point } => {
                write!(f, "nothing mounted at {mount_point}, nothing to expand")
            }
            Self::NothingToAbsorb { volume } => {
                write!(f, "no blank disks found for {volume}, nothing to expand")
            }
            Self::Expanded { volume, absorbed } if absorbed.is_empty() => {
                write!(f, "grew {volume} into existing free space")
            }
            Self::Expanded { volume, absorbed } => {
                write!(f, "absorbed {} into {volume}", absorbed.join(", "))
            }
        }
    }
}
