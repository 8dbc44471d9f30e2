//! The module command plane (spec §4.7, C9): a local per-process command socket and a remote
//! registration/ping plane behind a ROUTER.

pub mod local;
pub mod proxy;
pub mod remote;
pub mod table;

pub use local::{CommandHandler, LocalModuleService};
pub use proxy::ModuleProxy;
pub use remote::{PingAction, PingSchedule, RemoteRegistry};
pub use table::{LocalModuleRow, LocalModuleTable};
