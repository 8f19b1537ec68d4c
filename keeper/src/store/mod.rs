//! Persistence of registries and upkeep registrations.

mod base;
mod memory;
mod postgres;

pub use base::*;
pub use memory::*;
pub use postgres::*;
