// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;

use crate::traits::{
    DiskQueryAdapter, FilesystemOpsAdapter, LvmOpsAdapter, LvmQueryAdapter, MountOpsAdapter,
    SignatureAdapter,
};

/// One adapter per concern, handed to the reconcilers.
#[derive(Clone)]
pub struct HostAdapters {
    pub disks: Arc<dyn DiskQueryAdapter>,
    pub signatures: Arc<dyn SignatureAdapter>,
    pub lvm_query: Arc<dyn LvmQueryAdapter>,
    pub lvm_ops: Arc<dyn LvmOpsAdapter>,
    pub filesystem_ops: Arc<dyn FilesystemOpsAdapter>,
    pub mounts: Arc<dyn MountOpsAdapter>,
}

impl HostAdapters {
    /// Routes every concern to a single host implementation.
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: DiskQueryAdapter
            + SignatureAdapter
            + LvmQueryAdapter
            + LvmOpsAdapter
            + FilesystemOpsAdapter
            + MountOpsAdapter
            + 'static,
    {
        Self {
            disks: host.clone(),
            signatures: host.clone(),
            lvm_query: host.clone(),
            lvm_ops: host.clone(),
            filesystem_ops: host.clone(),
            mounts: host,
        }
    }
}
