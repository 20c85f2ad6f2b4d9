use serde::{Deserialize, Serialize};

/// One mutating call made against the simulated host, in call order.
///
/// Recorded whether or not the call changed anything or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Mutation {
    CreatePhysicalVolume { device: String },
    CreateVolumeGroup { vg_name: String, device: String },
    ExtendVolumeGroup { vg_name: String, device: String },
    CreateLogicalVolume { vg_name: String, lv_name: String },
    ExtendLogicalVolume { lv_path: String },
    FormatFilesystem { device: String, fs_type: String },
    GrowFilesystem { device: String },
    EnsureMountPoint { mount_point: String },
    PersistMountEntry { spec: String, mount_point: String },
    Mount { mount_point: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    CreatePhysicalVolume,
    CreateVolumeGroup,
    ExtendVolumeGroup,
    CreateLogicalVolume,
    ExtendLogicalVolume,
    FormatFilesystem,
    GrowFilesystem,
    EnsureMountPoint,
    PersistMountEntry,
    Mount,
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::CreatePhysicalVolume { .. } => MutationKind::CreatePhysicalVolume,
            Self::CreateVolumeGroup { .. } => MutationKind::CreateVolumeGroup,
            Self::ExtendVolumeGroup { .. } => MutationKind::ExtendVolumeGroup,
            Self::CreateLogicalVolume { .. } => MutationKind::CreateLogicalVolume,
            Self::ExtendLogicalVolume { .. } => MutationKind::ExtendLogicalVolume,
            Self::FormatFilesystem { .. } => MutationKind::FormatFilesystem,
            Self::GrowFilesystem { .. } => MutationKind::GrowFilesystem,
            Self::EnsureMountPoint { .. } => MutationKind::EnsureMountPoint,
            Self::PersistMountEntry { .. } => MutationKind::PersistMountEntry,
            Self::Mount { .. } => MutationKind::Mount,
        }
    }

    /// Whether the call touches LVM or filesystem metadata (as opposed to
    /// mount bookkeeping)
    pub fn is_storage_change(&self) -> bool {
        !matches!(
            self.kind(),
            MutationKind::EnsureMountPoint | MutationKind::PersistMountEntry | MutationKind::Mount
        )
    }
}
