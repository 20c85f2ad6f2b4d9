// SPDX-License-Identifier: GPL-3.0-only

pub mod disk;
pub mod filesystem;
pub mod lvm;
pub mod mount;

pub use disk::{DiskQueryAdapter, SignatureAdapter};
pub use filesystem::FilesystemOpsAdapter;
pub use lvm::{LvmOpsAdapter, LvmQueryAdapter};
pub use mount::MountOpsAdapter;
