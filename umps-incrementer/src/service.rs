//! The incrementer's reply service (spec §4.8, C10): answers `IncrementRequest`/`ItemsRequest`
//! over a single [`Reply`] socket, typically connected to the dealer side of a service proxy.

use std::sync::Arc;

use umps_base::error::Result;
use umps_base::task::JoinGuard;
use umps_messages::details::ReturnCode;
use umps_messages::incrementer::{IncrementRequest, IncrementResponse, ItemsRequest, ItemsResponse};
use umps_messages::registry::Registry;
use umps_messages::{Message, MessageType};
use umps_transport::{Context, Reply, ReplyCallback, SocketOptions};

use crate::store::Store;

fn request_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<IncrementRequest>();
    registry.register::<ItemsRequest>();
    registry
}

fn handle(type_tag: &str, body: &[u8], store: &Store) -> Box<dyn Message> {
    match type_tag {
        "IncrementRequest" => match IncrementRequest::deserialize(body) {
            Ok(request) => Box::new(match store.get_next_value(&request.item) {
                Ok(value) => IncrementResponse {
                    value: Some(value),
                    identifier: request.identifier,
                    return_code: ReturnCode::Success,
                },
                Err(_) => IncrementResponse {
                    value: None,
                    identifier: request.identifier,
                    return_code: ReturnCode::AlgorithmFailure,
                },
            }),
            Err(_) => Box::new(IncrementResponse {
                value: None,
                identifier: 0,
                return_code: ReturnCode::InvalidMessage,
            }),
        },
        "ItemsRequest" => match ItemsRequest::deserialize(body) {
            Ok(request) => Box::new(match store.get_items() {
                Ok(items) => ItemsResponse {
                    items,
                    identifier: request.identifier,
                    return_code: ReturnCode::Success,
                },
                Err(_) => ItemsResponse {
                    items: Vec::new(),
                    identifier: request.identifier,
                    return_code: ReturnCode::AlgorithmFailure,
                },
            }),
            Err(_) => Box::new(ItemsResponse {
                items: Vec::new(),
                identifier: 0,
                return_code: ReturnCode::InvalidMessage,
            }),
        },
        _ => Box::new(ItemsResponse {
            items: Vec::new(),
            identifier: 0,
            return_code: ReturnCode::InvalidMessage,
        }),
    }
}

/// Owns the incrementer's reply socket thread and the store it answers from.
pub struct IncrementerService {
    guard: JoinGuard<Result<()>>,
    store: Arc<Store>,
}

impl IncrementerService {
    pub fn spawn(context: &Context, options: SocketOptions, store: Arc<Store>) -> Result<Self> {
        let mut reply = Reply::new();
        reply.initialize(context, options)?;

        let callback_store = store.clone();
        let callback: ReplyCallback = Box::new(move |type_tag, body| handle(type_tag, body, &callback_store));

        let guard = JoinGuard::spawn(move |cancel| async move {
            let wire_registry = request_registry();
            reply.serve(&wire_registry, &callback, &cancel).await
        });

        Ok(Self { guard, store })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub async fn stop(&mut self) -> Result<()> {
        match self.guard.shutdown().await {
            Ok(result) => result,
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umps_transport::{ConnectOrBind, Request};

    #[tokio::test]
    async fn service_round_trips_an_increment_request() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::initialize(dir.path().join("counters.sqlite3"), false).unwrap());

        let context = Context::new(1).unwrap();
        let options = SocketOptions {
            address: "inproc://incrementer-test".to_string(),
            connect_or_bind: ConnectOrBind::Bind,
            ..SocketOptions::default()
        };
        let mut service = IncrementerService::spawn(&context, options, store).unwrap();

        let mut client = Request::new();
        client
            .initialize(
                &context,
                SocketOptions {
                    address: "inproc://incrementer-test".to_string(),
                    connect_or_bind: ConnectOrBind::Connect,
                    ..SocketOptions::default()
                },
            )
            .unwrap();

        let mut registry = Registry::new();
        registry.register::<IncrementResponse>();

        let request = IncrementRequest {
            item: "Amplitude".to_string(),
            identifier: 7,
        };
        let reply = client.request(&request, &registry).await.unwrap();
        let response = IncrementResponse::deserialize(&reply.serialize().unwrap()).unwrap();
        assert_eq!(response.value, Some(1));
        assert_eq!(response.identifier, 7);
        assert_eq!(response.return_code, ReturnCode::Success);

        service.stop().await.unwrap();
    }
}
