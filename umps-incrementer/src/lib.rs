//! The persistent identifier counter (spec §4.8, C10).

pub mod service;
pub mod store;

pub use service::IncrementerService;
pub use store::{Store, DEFAULT_ITEMS};
