//! Typed wire messages (spec §3 "Message", C5) and their CBOR/JSON encoding.

pub mod details;
pub mod incrementer;
pub mod message;
pub mod modules;
pub mod operator;
pub mod registry;
pub mod wire;

pub use details::{ApplicationStatus, ConnectionType, Details, ModuleDetails, ReturnCode, SocketDetails};
pub use message::{Message, MessageType};
pub use registry::Registry;

/// Builds the registry covering every message type this crate defines, for components that
/// need to accept any of them on one socket (e.g. a generic wire-debugging tool).
pub fn full_registry() -> Registry {
    let mut registry = Registry::new();

    registry.register::<operator::AvailableConnectionsRequest>();
    registry.register::<operator::AvailableBroadcastsRequest>();
    registry.register::<operator::ServiceDetailsRequest>();
    registry.register::<operator::BroadcastDetailsRequest>();
    registry.register::<operator::ConnectionDetailsResponse>();

    registry.register::<modules::CommandsRequest>();
    registry.register::<modules::AvailableCommandsResponse>();
    registry.register::<modules::CommandRequest>();
    registry.register::<modules::CommandResponse>();
    registry.register::<modules::TerminateRequest>();
    registry.register::<modules::TerminateResponse>();
    registry.register::<modules::RegistrationRequest>();
    registry.register::<modules::RegistrationResponse>();
    registry.register::<modules::AvailableModulesRequest>();
    registry.register::<modules::AvailableModulesResponse>();
    registry.register::<modules::PingRequest>();
    registry.register::<modules::PingResponse>();

    registry.register::<incrementer::IncrementRequest>();
    registry.register::<incrementer::IncrementResponse>();
    registry.register::<incrementer::ItemsRequest>();
    registry.register::<incrementer::ItemsResponse>();

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_registry_knows_every_message_type() {
        let registry = full_registry();
        assert!(registry.is_known("IncrementRequest"));
        assert!(registry.is_known("RegistrationRequest"));
        assert!(!registry.is_known("Nonsense"));
    }
}
