// SPDX-License-Identifier: GPL-3.0-only

//! Host operations backed by command-line tools
//!
//! This crate implements every datavol capability by running the standard
//! Linux storage tools, either locally or on a remote host over ssh:
//! - `lsblk` for block device enumeration
//! - `blkid` for signature, filesystem type and UUID lookups
//! - `pvs`/`vgs`/`lvs` and `pvcreate`/`vgcreate`/`vgextend`/`lvcreate`/`lvextend`
//! - `mkfs.ext4`/`resize2fs`
//! - `findmnt`, `mount` and `/etc/fstab`
//!
//! All tool output is parsed here; nothing above this crate sees free text.
//! These operations require elevated privileges on the target host.

pub mod blkid;
pub mod error;
pub mod fs_tools;
pub mod host;
pub mod lsblk;
pub mod lvm_tools;
pub mod mounts;
pub mod runner;

pub use error::{Result, SysError};
pub use host::{CommandHost, build_ssh_adapters};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, LocalRunner, SshRunner};
