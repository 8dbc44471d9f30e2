//! `SocketDetails` (spec §3 "SocketDetails", shared by C6 and C8).

use umps_auth::SecurityLevel;

use crate::options::ConnectOrBind;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SocketPattern {
    Publisher,
    Subscriber,
    XPublisher,
    XSubscriber,
    Request,
    Reply,
    Router,
    Dealer,
    Proxy,
}

/// Minimum privilege required to connect, mirrored from `umps_auth::Privilege` so this crate
/// does not need to depend on the authenticator's storage-facing types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MinimumPrivilege {
    ReadOnly,
    ReadWrite,
    Admin,
}

/// A tagged description of one socket's configuration (spec §3).
///
/// Invariant: `address` is non-empty iff the owning socket has been initialized.
#[derive(Clone, Debug)]
pub struct SocketDetails {
    pub pattern: SocketPattern,
    pub address: String,
    pub security_level: SecurityLevel,
    pub minimum_user_privileges: MinimumPrivilege,
    pub connect_or_bind: ConnectOrBind,
    pub frontend: Option<Box<SocketDetails>>,
    pub backend: Option<Box<SocketDetails>>,
}

impl SocketDetails {
    pub fn uninitialized(pattern: SocketPattern, security_level: SecurityLevel) -> Self {
        Self {
            pattern,
            address: String::new(),
            security_level,
            minimum_user_privileges: MinimumPrivilege::ReadOnly,
            connect_or_bind: ConnectOrBind::Connect,
            frontend: None,
            backend: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.address.is_empty()
    }

    pub fn proxy(frontend: SocketDetails, backend: SocketDetails) -> Self {
        let security_level = frontend.security_level;
        Self {
            pattern: SocketPattern::Proxy,
            address: format!("{}|{}", frontend.address, backend.address),
            security_level,
            minimum_user_privileges: MinimumPrivilege::ReadOnly,
            connect_or_bind: ConnectOrBind::Bind,
            frontend: Some(Box::new(frontend)),
            backend: Some(Box::new(backend)),
        }
    }
}
