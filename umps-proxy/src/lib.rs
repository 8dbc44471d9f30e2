//! The two proxy shapes of the messaging middleware (spec §4.5, C7): a broadcast proxy
//! (XSUB frontend / XPUB backend) and a service proxy (ROUTER frontend / DEALER backend),
//! both driven by the same `Created -> Ready -> Running <-> Paused -> Stopped` state machine.

mod broadcast;
mod service;
mod state;

pub use broadcast::BroadcastProxy;
pub use service::ServiceProxy;
pub use state::ProxyState;
