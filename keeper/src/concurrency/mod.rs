//! Signalling primitives for the synchronizer loop and its workers.

pub mod shutdown;
pub mod trigger;
