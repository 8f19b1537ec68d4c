//! Reconciliation of the local mirror with the registry contract.

mod engine;
mod outcome;

pub use engine::*;
pub use outcome::*;
