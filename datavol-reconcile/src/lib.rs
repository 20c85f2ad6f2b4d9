// SPDX-License-Identifier: GPL-3.0-only

//! Discovery and reconciliation of the data volume
//!
//! Two entry flows share the leaf capabilities in this crate:
//!
//! - [`BootstrapReconciler`] configures a fresh host: mount the one existing
//!   logical volume, or build PV → VG → LV → filesystem on a blank disk.
//! - [`ExpansionReconciler`] absorbs newly attached blank disks into the
//!   mounted volume and grows it in place.
//!
//! Both only talk to the host through [`HostAdapters`]; every step is safe to
//! repeat from whatever state an interrupted run left behind.

pub mod bootstrap;
pub mod classifier;
pub mod enumerator;
pub mod error;
pub mod expansion;
pub mod inspector;
pub mod mount;

pub use bootstrap::BootstrapReconciler;
pub use classifier::{blank_disks, classify, is_blank};
pub use enumerator::candidate_disks;
pub use error::{ReconcileError, Result};
pub use expansion::ExpansionReconciler;
pub use inspector::Inspector;
pub use mount::ensure_mount_binding;

use datavol_contracts::HostAdapters;
use datavol_types::{BootstrapOutcome, ExpansionOutcome, ReconcileConfig};

pub async fn bootstrap(
    adapters: &HostAdapters,
    config: &ReconcileConfig,
) -> Result<BootstrapOutcome> {
    BootstrapReconciler::new(adapters, config).run().await
}

pub async fn expand(adapters: &HostAdapters, config: &ReconcileConfig) -> Result<ExpansionOutcome> {
    ExpansionReconciler::new(adapters, config).run().await
}
