mod base;
mod connection;
mod job;
mod node;
mod store;
mod synchronizer;

pub use base::*;
pub use connection::*;
pub use job::*;
pub use node::*;
pub use store::*;
pub use synchronizer::*;
