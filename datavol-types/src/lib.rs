// SPDX-License-Identifier: GPL-3.0-only

//! Canonical data model for datavol
//!
//! These types are shared by every layer of the stack:
//!
//! - **datavol-sys**: parses tool output into these types
//! - **datavol-contracts**: capability traits speak only in these types
//! - **datavol-reconcile**: the bootstrap and expansion state machines
//!   operate on them and never on raw command output
//!
//! ## Hierarchy
//!
//! - `BlockDevice` → raw disk discovered on the host
//! - `PhysicalVolumeInfo` → a disk registered with LVM
//! - `LogicalVolumeRef` → the (group, volume, path) triple that gets mounted
//! - `FstabEntry` → the persisted half of a mount binding

pub mod config;
pub mod device;
pub mod filesystem;
pub mod lvm;
pub mod mount;
pub mod outcome;

pub use config::*;
pub use device::*;
pub use filesystem::*;
pub use lvm::*;
pub use mount::*;
pub use outcome::*;
