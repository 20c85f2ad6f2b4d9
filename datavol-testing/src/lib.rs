//! Test support for datavol
//!
//! [`SimulatedHost`] keeps the whole block/LVM/mount state of a host in
//! memory and implements every capability trait with the same idempotence
//! rules as the real tools. Every mutating call lands in a ledger so tests
//! can assert on what was attempted, not only on the end state.

pub mod adapters;
pub mod host;
pub mod ledger;

pub use host::{EXTENT_SIZE, GIB, SimulatedHost};
pub use ledger::{Mutation, MutationKind};
