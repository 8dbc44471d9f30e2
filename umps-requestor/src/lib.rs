//! Client-side request helpers for the operator, the incrementer, and the module command plane
//! (spec §4.9, C11). Each domain requestor wraps the same [`base::Requestor`]: open a request
//! socket, block for one reply up to the configured timeout, never retry.

mod base;
mod connection;
mod incrementer;
mod modules;

pub use base::Requestor;
pub use connection::{socket_options, ConnectionRequestor};
pub use incrementer::IncrementerRequestor;
pub use modules::ModuleRequestor;
