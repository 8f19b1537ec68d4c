//! Records mirrored from the registry contract.

mod job;
mod registry;
mod upkeep;

pub use job::*;
pub use registry::*;
pub use upkeep::*;
