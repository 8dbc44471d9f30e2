//! The connection-information requestor (spec §4.9): the operator's client-side counterpart,
//! INI-driven per spec §6's `[uOperator]` section.

use std::path::Path;
use std::time::Duration;

use umps_base::config::{load_operator_config, ZapSectionConfig};
use umps_base::error::{Error, Result};
use umps_messages::details::Details;
use umps_messages::operator::{
    AvailableBroadcastsRequest, AvailableConnectionsRequest, BroadcastDetailsRequest,
    ConnectionDetailsResponse, ServiceDetailsRequest,
};
use umps_messages::registry::Registry;
use umps_messages::{Message, MessageType};
use umps_transport::{Context, SocketOptions, TimeOut};

use crate::base::Requestor;

fn response_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<ConnectionDetailsResponse>();
    registry
}

fn decode(reply: Box<dyn Message>) -> Result<ConnectionDetailsResponse> {
    ConnectionDetailsResponse::deserialize(&reply.serialize()?)
}

/// Builds the socket options an operator client uses, from an already-parsed `[uOperator]`
/// section. The ZAP side of the options (security level, keys, credentials) is intentionally
/// left to the caller, since constructing an [`umps_auth::ZapOptions`] from cleartext INI values
/// requires choices (e.g. which stored keypair to load) this crate cannot make generically.
pub fn socket_options(address: String, time_out_ms: Option<i64>, zap_options: Option<umps_auth::ZapOptions>) -> SocketOptions {
    SocketOptions {
        address,
        time_out: time_out_ms
            .map(|ms| TimeOut::Bounded(Duration::from_millis(ms.max(0) as u64)))
            .unwrap_or(TimeOut::Forever),
        zap_options,
        ..SocketOptions::default()
    }
}

pub struct ConnectionRequestor {
    base: Requestor,
}

impl ConnectionRequestor {
    pub fn new(context: Context) -> Self {
        Self { base: Requestor::new(context) }
    }

    pub fn initialize(&mut self, options: SocketOptions) -> Result<()> {
        self.base.initialize(options)
    }

    /// Parses `[uOperator]` from `path` and initializes against it. Callers who need
    /// authentication build `zap_options` themselves and pass it through; `[uOperator]`'s
    /// `zap.*` keys are exposed via [`load_operator_config`] for that purpose.
    pub fn initialize_from_ini(
        &mut self,
        path: impl AsRef<Path>,
        zap_options: Option<umps_auth::ZapOptions>,
    ) -> Result<ZapSectionConfig> {
        let config = load_operator_config(path)?;
        self.initialize(socket_options(config.address, config.time_out_ms, zap_options))?;
        Ok(config.zap)
    }

    pub async fn get_available_connections(&mut self) -> Result<Vec<Details>> {
        self.answer(&AvailableConnectionsRequest).await
    }

    pub async fn get_available_broadcasts(&mut self) -> Result<Vec<Details>> {
        self.answer(&AvailableBroadcastsRequest).await
    }

    pub async fn get_service_details(&mut self, name: &str) -> Result<Option<Details>> {
        let mut details = self.answer(&ServiceDetailsRequest { name: name.to_string() }).await?;
        Ok(details.pop())
    }

    pub async fn get_broadcast_details(&mut self, name: &str) -> Result<Option<Details>> {
        let mut details = self.answer(&BroadcastDetailsRequest { name: name.to_string() }).await?;
        Ok(details.pop())
    }

    async fn answer(&mut self, message: &dyn Message) -> Result<Vec<Details>> {
        let registry = response_registry();
        let reply = self.base.request(message, &registry).await?;
        let response = decode(reply)?;
        match response.return_code {
            umps_messages::details::ReturnCode::Success => Ok(response.details),
            umps_messages::details::ReturnCode::NoItem => Ok(Vec::new()),
            other => Err(Error::algorithm_failure(format!("operator returned {other:?}"))),
        }
    }

    pub fn disconnect(&mut self) {
        self.base.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umps_messages::details::{ConnectionType, SocketDetails};
    use umps_transport::ConnectOrBind;
    use umps_operator::OperatorService;

    #[tokio::test]
    async fn get_service_details_round_trips_through_a_live_operator() {
        let context = Context::new(1).unwrap();
        let options = SocketOptions {
            address: "inproc://requestor-connection-test".to_string(),
            connect_or_bind: ConnectOrBind::Bind,
            ..SocketOptions::default()
        };
        let service = OperatorService::spawn(&context, options).unwrap();
        service
            .registry()
            .add_connection(Details {
                name: "picker".to_string(),
                connection_type: ConnectionType::Service,
                socket_details: SocketDetails::default(),
            })
            .unwrap();

        let mut requestor = ConnectionRequestor::new(context.clone());
        requestor
            .initialize(SocketOptions {
                address: "inproc://requestor-connection-test".to_string(),
                connect_or_bind: ConnectOrBind::Connect,
                ..SocketOptions::default()
            })
            .unwrap();

        let details = requestor.get_service_details("picker").await.unwrap();
        assert_eq!(details.unwrap().name, "picker");

        assert!(requestor.get_service_details("missing").await.unwrap().is_none());

        requestor.disconnect();
    }
}
