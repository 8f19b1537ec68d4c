pub mod base;
pub mod batch;
pub mod synchronizer;
