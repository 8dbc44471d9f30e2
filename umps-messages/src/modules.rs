//! Module command-plane wire messages (spec §4.7, C9).

use serde::{Deserialize, Serialize};

use crate::details::ModuleDetails;
use crate::impl_message;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandsRequest;
impl_message!(CommandsRequest, "CommandsRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableCommandsResponse {
    pub commands: Vec<String>,
}
impl_message!(AvailableCommandsResponse, "AvailableCommandsResponse");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub text: String,
}
impl_message!(CommandRequest, "CommandRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub text: String,
}
impl_message!(CommandResponse, "CommandResponse");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminateRequest;
impl_message!(TerminateRequest, "TerminateRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminateResponse;
impl_message!(TerminateResponse, "TerminateResponse");

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum RegistrationAction {
    #[default]
    Register,
    Deregister,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub module_details: ModuleDetails,
    pub action: RegistrationAction,
}
impl_message!(RegistrationRequest, "RegistrationRequest");

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    #[default]
    Accepted,
    Rejected,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub status: RegistrationStatus,
}
impl_message!(RegistrationResponse, "RegistrationResponse");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableModulesRequest;
impl_message!(AvailableModulesRequest, "AvailableModulesRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableModulesResponse {
    pub modules: Vec<ModuleDetails>,
}
impl_message!(AvailableModulesResponse, "AvailableModulesResponse");

/// Ping / Terminate frames the proxy's schedule (spec §4.7) sends to a module's dealer-side
/// replier. Distinct from the local command plane's `TerminateRequest`/`TerminateResponse`,
/// which travel over the per-process `ipc://` socket instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PingRequest;
impl_message!(PingRequest, "PingRequest");

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PingResponse;
impl_message!(PingResponse, "PingResponse");
