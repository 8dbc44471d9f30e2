//! The operator reply service (spec §4.6, C8): answers the four connection-information request
//! types over a single [`Reply`] socket.

use std::sync::Arc;

use umps_base::error::Result;
use umps_base::task::JoinGuard;
use umps_messages::details::ConnectionType;
use umps_messages::operator::{
    AvailableBroadcastsRequest, AvailableConnectionsRequest, BroadcastDetailsRequest,
    ConnectionDetailsResponse, ServiceDetailsRequest,
};
use umps_messages::registry::Registry;
use umps_messages::{Message, MessageType};
use umps_transport::{Context, Reply, ReplyCallback, SocketOptions};

use crate::registry::ConnectionRegistry;

fn request_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<AvailableConnectionsRequest>();
    registry.register::<AvailableBroadcastsRequest>();
    registry.register::<ServiceDetailsRequest>();
    registry.register::<BroadcastDetailsRequest>();
    registry
}

fn handle(type_tag: &str, body: &[u8], registry: &ConnectionRegistry) -> Box<dyn Message> {
    let response = match type_tag {
        "AvailableConnectionsRequest" => {
            ConnectionDetailsResponse::success(registry.available(ConnectionType::Service))
        }
        "AvailableBroadcastsRequest" => {
            ConnectionDetailsResponse::success(registry.available(ConnectionType::Broadcast))
        }
        "ServiceDetailsRequest" => match ServiceDetailsRequest::deserialize(body) {
            Ok(request) => match registry.lookup(&request.name, ConnectionType::Service) {
                Some(details) => ConnectionDetailsResponse::success(vec![details]),
                None => ConnectionDetailsResponse::no_item(),
            },
            Err(_) => ConnectionDetailsResponse::invalid_message(),
        },
        "BroadcastDetailsRequest" => match BroadcastDetailsRequest::deserialize(body) {
            Ok(request) => match registry.lookup(&request.name, ConnectionType::Broadcast) {
                Some(details) => ConnectionDetailsResponse::success(vec![details]),
                None => ConnectionDetailsResponse::no_item(),
            },
            Err(_) => ConnectionDetailsResponse::invalid_message(),
        },
        _ => ConnectionDetailsResponse::invalid_message(),
    };
    Box::new(response)
}

/// Owns the operator's reply socket thread and the registry it answers from.
pub struct OperatorService {
    guard: JoinGuard<Result<()>>,
    registry: Arc<ConnectionRegistry>,
}

impl OperatorService {
    pub fn spawn(context: &Context, options: SocketOptions) -> Result<Self> {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut reply = Reply::new();
        reply.initialize(context, options)?;

        let callback_registry = registry.clone();
        let callback: ReplyCallback =
            Box::new(move |type_tag, body| handle(type_tag, body, &callback_registry));

        let guard = JoinGuard::spawn(move |cancel| async move {
            let wire_registry = request_registry();
            reply.serve(&wire_registry, &callback, &cancel).await
        });

        Ok(Self { guard, registry })
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub async fn stop(&mut self) -> Result<()> {
        match self.guard.shutdown().await {
            Ok(result) => result,
            Err(_) => Ok(()),
        }
    }
}
