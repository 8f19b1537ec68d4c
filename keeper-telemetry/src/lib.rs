//! Tracing setup shared by keeper binaries and tests.

pub mod tracing;
