//! Mirrors an on-chain keeper registry into a local store.
//!
//! A [`workers::synchronizer::RegistrySynchronizer`] periodically reconciles the registry
//! configuration, keeper list and upkeeps of one job with the contract, and stores for every
//! upkeep the [`positioning::calc_positioning_constant`] nodes use to share checking work
//! without coordinating.

pub mod chain;
pub mod concurrency;
pub mod error;
mod macros;
pub mod node;
pub mod positioning;
pub mod reporter;
pub mod state;
pub mod store;
pub mod sync;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;
