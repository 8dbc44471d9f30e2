//! Incrementer wire messages (spec §4.8 table, C10).

use serde::{Deserialize, Serialize};

use crate::details::ReturnCode;
use crate::impl_message;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncrementRequest {
    pub item: String,
    pub identifier: u64,
}
impl_message!(IncrementRequest, "IncrementRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncrementResponse {
    pub value: Option<i64>,
    pub identifier: u64,
    pub return_code: ReturnCode,
}
impl_message!(IncrementResponse, "IncrementResponse");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemsRequest {
    pub identifier: u64,
}
impl_message!(ItemsRequest, "ItemsRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemsResponse {
    pub items: Vec<String>,
    pub identifier: u64,
    pub return_code: ReturnCode,
}
impl_message!(ItemsResponse, "ItemsResponse");
