// SPDX-License-Identifier: GPL-3.0-only

pub mod adapters;
pub mod protocol;
pub mod traits;

pub use adapters::HostAdapters;
pub use protocol::{StorageError, StorageErrorKind};
pub use traits::{
    DiskQueryAdapter, FilesystemOpsAdapter, LvmOpsAdapter, LvmQueryAdapter, MountOpsAdapter,
    SignatureAdapter,
};
