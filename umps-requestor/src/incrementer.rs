//! The incrementer requestor (spec §4.9): wraps `IncrementRequest`/`ItemsRequest` with a random
//! correlation identifier and unwraps the matching response (spec §4.8's `identifier` echo).

use umps_base::error::{Error, Result};
use umps_messages::details::ReturnCode;
use umps_messages::incrementer::{IncrementRequest, IncrementResponse, ItemsRequest, ItemsResponse};
use umps_messages::registry::Registry;
use umps_messages::{Message, MessageType};
use umps_transport::{Context, SocketOptions};

use crate::base::Requestor;

fn response_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<IncrementResponse>();
    registry.register::<ItemsResponse>();
    registry
}

pub struct IncrementerRequestor {
    base: Requestor,
}

impl IncrementerRequestor {
    pub fn new(context: Context) -> Self {
        Self { base: Requestor::new(context) }
    }

    pub fn initialize(&mut self, options: SocketOptions) -> Result<()> {
        self.base.initialize(options)
    }

    /// The wire item table has no separate "peek current value" request (spec §4.8 names only
    /// `get_next_value`/`get_items`); getting the next value is the only way to read a counter.
    pub async fn get_next_value(&mut self, item: &str) -> Result<i64> {
        let identifier: u64 = rand::random();
        let request = IncrementRequest { item: item.to_string(), identifier };
        let reply = self.base.request(&request, &response_registry()).await?;
        let response = IncrementResponse::deserialize(&reply.serialize()?)?;
        if response.identifier != identifier {
            return Err(Error::algorithm_failure("incrementer response identifier mismatch"));
        }
        match response.return_code {
            ReturnCode::Success => response
                .value
                .ok_or_else(|| Error::algorithm_failure("incrementer returned success with no value")),
            ReturnCode::NoItem => Err(Error::not_found(item)),
            other => Err(Error::algorithm_failure(format!("incrementer returned {other:?}"))),
        }
    }

    pub async fn get_items(&mut self) -> Result<Vec<String>> {
        let identifier: u64 = rand::random();
        let request = ItemsRequest { identifier };
        let reply = self.base.request(&request, &response_registry()).await?;
        let response = ItemsResponse::deserialize(&reply.serialize()?)?;
        if response.identifier != identifier {
            return Err(Error::algorithm_failure("incrementer response identifier mismatch"));
        }
        match response.return_code {
            ReturnCode::Success => Ok(response.items),
            other => Err(Error::algorithm_failure(format!("incrementer returned {other:?}"))),
        }
    }

    pub fn disconnect(&mut self) {
        self.base.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use umps_incrementer::{IncrementerService, Store};
    use umps_transport::ConnectOrBind;

    #[tokio::test]
    async fn get_next_value_and_get_items_round_trip_through_a_live_service() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::initialize(dir.path().join("counters.sqlite3"), false).unwrap());

        let context = Context::new(1).unwrap();
        let options = SocketOptions {
            address: "inproc://incrementer-requestor-test".to_string(),
            connect_or_bind: ConnectOrBind::Bind,
            ..SocketOptions::default()
        };
        let mut service = IncrementerService::spawn(&context, options, store).unwrap();

        let mut requestor = IncrementerRequestor::new(context.clone());
        requestor
            .initialize(SocketOptions {
                address: "inproc://incrementer-requestor-test".to_string(),
                connect_or_bind: ConnectOrBind::Connect,
                ..SocketOptions::default()
            })
            .unwrap();

        let items = requestor.get_items().await.unwrap();
        assert!(items.contains(&"Amplitude".to_string()));

        let first = requestor.get_next_value("Amplitude").await.unwrap();
        let second = requestor.get_next_value("Amplitude").await.unwrap();
        assert_eq!(second, first + 1);

        let error = requestor.get_next_value("NoSuchItem").await.unwrap_err();
        assert!(matches!(error, Error::AlgorithmFailure { .. }));

        service.stop().await.unwrap();
    }
}
