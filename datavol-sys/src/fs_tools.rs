// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem creation and growth tools

use datavol_types::FilesystemKind;

use crate::error::{Result, SysError};
use crate::runner::CommandSpec;

pub fn mkfs(device: &str, fs_type: FilesystemKind) -> Result<CommandSpec> {
    match fs_type {
        FilesystemKind::Ext4 if cfg!(feature = "fs-ext4") => {
            Ok(CommandSpec::new("mkfs.ext4").args(["-q", device]))
        }
        other => Err(SysError::NotSupported(format!(
            "creating {other} filesystems (compile-time feature disabled)"
        ))),
    }
}

/// Online growth to the full size of the underlying device
pub fn grow(device: &str, fs_type: FilesystemKind) -> Result<CommandSpec> {
    match fs_type {
        FilesystemKind::Ext4 if cfg!(feature = "fs-ext4") => {
            Ok(CommandSpec::new("resize2fs").arg(device))
        }
        other => Err(SysError::NotSupported(format!(
            "growing {other} filesystems (compile-time feature disabled)"
        ))),
    }
}
