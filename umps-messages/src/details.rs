//! Wire-safe connection and module descriptors (spec §3 "SocketDetails", "Details",
//! "ModuleDetails"). These mirror `umps_transport::SocketDetails` but never carry key material,
//! since they cross the wire in operator/registration responses.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum SecurityLevel {
    #[default]
    Grasslands,
    Strawhouse,
    Woodhouse,
    Stonehouse,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum MinimumPrivilege {
    #[default]
    ReadOnly,
    ReadWrite,
    Admin,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConnectOrBind {
    #[default]
    Connect,
    Bind,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum SocketPattern {
    #[default]
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

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SocketDetails {
    pub pattern: SocketPattern,
    pub address: String,
    pub security_level: SecurityLevel,
    pub minimum_user_privileges: MinimumPrivilege,
    pub connect_or_bind: ConnectOrBind,
    pub frontend: Option<Box<SocketDetails>>,
    pub backend: Option<Box<SocketDetails>>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConnectionType {
    #[default]
    Service,
    Broadcast,
}

/// An operator registry entry (spec §3 "Details").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    pub name: String,
    pub connection_type: ConnectionType,
    pub socket_details: SocketDetails,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Running,
    NotRunning,
    #[default]
    Unknown,
}

/// spec §3 "ModuleDetails". Invariant: `ipc_file_name` is well-defined iff `name` is set, which
/// this type enforces by making `name` non-optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleDetails {
    pub name: String,
    pub executable_name: Option<String>,
    pub machine: Option<String>,
    pub pid: Option<u32>,
    pub parent_pid: Option<u32>,
    pub instance: u16,
    pub application_status: ApplicationStatus,
    pub ipc_directory: Option<String>,
}

/// Sanitizes a module name to the `[A-Za-z0-9_.-]` charset used for IPC file names (spec §6).
pub fn sanitize_module_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl ModuleDetails {
    /// `"<ipc_directory>/<sanitized_name>.ipc"` (spec §6).
    pub fn ipc_file_name(&self) -> Option<String> {
        let directory = self.ipc_directory.as_deref().unwrap_or(".");
        if self.name.is_empty() {
            return None;
        }
        Some(format!("{directory}/{}.ipc", sanitize_module_name(&self.name)))
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ReturnCode {
    Success,
    NoItem,
    #[default]
    InvalidMessage,
    AlgorithmFailure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_non_charset_bytes() {
        assert_eq!(sanitize_module_name("pick er/01"), "pick_er_01");
    }

    #[test]
    fn ipc_file_name_requires_a_name() {
        let details = ModuleDetails::default();
        assert!(details.ipc_file_name().is_none());
    }

    #[test]
    fn ipc_file_name_joins_directory_and_sanitized_name() {
        let details = ModuleDetails {
            name: "picker one".to_string(),
            ipc_directory: Some("/tmp/umps".to_string()),
            ..Default::default()
        };
        assert_eq!(
            details.ipc_file_name().as_deref(),
            Some("/tmp/umps/picker_one.ipc")
        );
    }
}
