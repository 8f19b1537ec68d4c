//! Per-job error recording.

mod base;
mod memory;
mod postgres;

pub use base::*;
pub use memory::*;
pub use postgres::*;
