//! The operator's `name → Details` registry (spec §4.6, C8), mutex-guarded per spec §5's
//! explicit exception for this component.

use std::collections::HashMap;
use std::sync::Mutex;

use umps_base::error::{Error, Result};
use umps_messages::details::ConnectionType;
use umps_messages::Details;

#[derive(Default)]
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<String, Details>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects a duplicate name (spec §4.6: "rejects duplicates").
    pub fn add_connection(&self, details: Details) -> Result<()> {
        let mut entries = self.entries.lock().expect("registry mutex poisoned");
        if entries.contains_key(&details.name) {
            return Err(Error::invalid_argument(format!(
                "connection {:?} already registered",
                details.name
            )));
        }
        entries.insert(details.name.clone(), details);
        Ok(())
    }

    pub fn remove_connection(&self, name: &str) {
        self.entries
            .lock()
            .expect("registry mutex poisoned")
            .remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .lock()
            .expect("registry mutex poisoned")
            .contains_key(name)
    }

    /// All entries of `connection_type`, in no particular order.
    pub fn available(&self, connection_type: ConnectionType) -> Vec<Details> {
        self.entries
            .lock()
            .expect("registry mutex poisoned")
            .values()
            .filter(|details| details.connection_type == connection_type)
            .cloned()
            .collect()
    }

    /// A single entry by exact name, filtered to `connection_type` (spec §4.6: "name lookup is
    /// case-sensitive exact match").
    pub fn lookup(&self, name: &str, connection_type: ConnectionType) -> Option<Details> {
        self.entries
            .lock()
            .expect("registry mutex poisoned")
            .get(name)
            .filter(|details| details.connection_type == connection_type)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umps_messages::details::SocketDetails;

    fn entry(name: &str, connection_type: ConnectionType) -> Details {
        Details {
            name: name.to_string(),
            connection_type,
            socket_details: SocketDetails::default(),
        }
    }

    #[test]
    fn add_rejects_duplicate_name() {
        let registry = ConnectionRegistry::new();
        registry
            .add_connection(entry("picker", ConnectionType::Service))
            .unwrap();
        assert!(registry
            .add_connection(entry("picker", ConnectionType::Broadcast))
            .is_err());
    }

    #[test]
    fn lookup_filters_by_connection_type() {
        let registry = ConnectionRegistry::new();
        registry
            .add_connection(entry("waves", ConnectionType::Broadcast))
            .unwrap();
        assert!(registry.lookup("waves", ConnectionType::Service).is_none());
        assert!(registry.lookup("waves", ConnectionType::Broadcast).is_some());
    }

    #[test]
    fn remove_then_contains_is_false() {
        let registry = ConnectionRegistry::new();
        registry
            .add_connection(entry("picker", ConnectionType::Service))
            .unwrap();
        registry.remove_connection("picker");
        assert!(!registry.contains("picker"));
    }
}
