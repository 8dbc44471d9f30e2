//! Shared foundation for every UMPS crate: cooperative task cancellation, error kinds,
//! timestamps, compiled-in parameters, INI configuration structs, and logging bootstrap.

pub mod config;
pub mod error;
pub mod logging;
pub mod param;
pub mod task;
pub mod time;

pub use error::{Error, Result};
pub use task::{Cancel, JoinGuard, ShutdownError};
pub use time::{Timestamp, TimestampExt};
