//! Authenticator policy, key material, and ZAP options (spec §4.1 C2, §3 "Keys"/"ZAPOptions").
//!
//! This crate is deliberately transport-independent: it has no `umps_transport` dependency, so
//! the ZAP background service that binds these policies to a socket lives in `umps_zap` instead.

pub mod authenticator;
pub mod hash;
pub mod keypair;
pub mod memory;
pub mod security;
pub mod sqlite;

pub use authenticator::{Authenticator, Decision, Privilege, User, Verdict};
pub use keypair::{KeyPair, UsernameAndPassword, KEY_LEN};
pub use memory::MemoryAuthenticator;
pub use security::{Role, SecurityLevel, ZapOptions};
pub use sqlite::SqliteAuthenticator;
