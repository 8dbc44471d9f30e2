//! Operator / connection-information wire messages (spec §4.6, C8).

use serde::{Deserialize, Serialize};

use crate::details::{Details, ReturnCode};
use crate::impl_message;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableConnectionsRequest;
impl_message!(AvailableConnectionsRequest, "AvailableConnectionsRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableBroadcastsRequest;
impl_message!(AvailableBroadcastsRequest, "AvailableBroadcastsRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDetailsRequest {
    pub name: String,
}
impl_message!(ServiceDetailsRequest, "ServiceDetailsRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastDetailsRequest {
    pub name: String,
}
impl_message!(BroadcastDetailsRequest, "BroadcastDetailsRequest");

/// Answers all four request types above; `details` is empty unless `return_code == Success`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDetailsResponse {
    pub return_code: ReturnCode,
    pub details: Vec<Details>,
}
impl_message!(ConnectionDetailsResponse, "ConnectionDetailsResponse");

impl ConnectionDetailsResponse {
    pub fn success(details: Vec<Details>) -> Self {
        Self {
            return_code: ReturnCode::Success,
            details,
        }
    }

    pub fn no_item() -> Self {
        Self {
            return_code: ReturnCode::NoItem,
            details: Vec::new(),
        }
    }

    pub fn invalid_message() -> Self {
        Self {
            return_code: ReturnCode::InvalidMessage,
            details: Vec::new(),
        }
    }

    pub fn algorithm_failure() -> Self {
        Self {
            return_code: ReturnCode::AlgorithmFailure,
            details: Vec::new(),
        }
    }
}
