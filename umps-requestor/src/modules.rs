//! The module requestor (spec §4.9): queries the remote registration plane for which modules
//! exist, then talks to a chosen module directly over its local `ipc://` command socket.
//!
//! The split mirrors the module command plane itself (spec §4.7): `AvailableModulesRequest`
//! travels to the proxy's ROUTER, while `CommandsRequest`/`CommandRequest`/`TerminateRequest`
//! travel to the module's own per-process REPLY socket, addressed via
//! [`ModuleDetails::ipc_file_name`].

use umps_base::error::{Error, Result};
use umps_messages::details::ModuleDetails;
use umps_messages::modules::{
    AvailableCommandsResponse, AvailableModulesRequest, AvailableModulesResponse, CommandRequest,
    CommandResponse, CommandsRequest, TerminateRequest, TerminateResponse,
};
use umps_messages::registry::Registry;
use umps_messages::{Message, MessageType};
use umps_transport::{ConnectOrBind, Context, SocketOptions};

use crate::base::Requestor;

fn remote_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<AvailableModulesResponse>();
    registry
}

fn local_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<AvailableCommandsResponse>();
    registry.register::<CommandResponse>();
    registry.register::<TerminateResponse>();
    registry
}

pub struct ModuleRequestor {
    context: Context,
    remote: Requestor,
}

impl ModuleRequestor {
    pub fn new(context: Context) -> Self {
        let remote = Requestor::new(context.clone());
        Self { context, remote }
    }

    /// Connects to the remote registration plane's ROUTER (a plain REQ socket round-trips
    /// against a ROUTER the same way it does against a REPLY).
    pub fn initialize(&mut self, options: SocketOptions) -> Result<()> {
        self.remote.initialize(options)
    }

    pub async fn get_available_modules(&mut self) -> Result<Vec<ModuleDetails>> {
        let reply = self.remote.request(&AvailableModulesRequest, &remote_registry()).await?;
        let response = AvailableModulesResponse::deserialize(&reply.serialize()?)?;
        Ok(response.modules)
    }

    async fn local_request(&self, module: &ModuleDetails, message: &dyn Message) -> Result<Box<dyn Message>> {
        let ipc_path = module
            .ipc_file_name()
            .ok_or_else(|| Error::invalid_argument("module has no ipc_directory"))?;
        let mut local = Requestor::new(self.context.clone());
        local.initialize(SocketOptions {
            address: format!("ipc://{ipc_path}"),
            connect_or_bind: ConnectOrBind::Connect,
            ..SocketOptions::default()
        })?;
        local.request(message, &local_registry()).await
    }

    pub async fn get_commands(&mut self, module: &ModuleDetails) -> Result<Vec<String>> {
        let reply = self.local_request(module, &CommandsRequest).await?;
        let response = AvailableCommandsResponse::deserialize(&reply.serialize()?)?;
        Ok(response.commands)
    }

    pub async fn issue_command(&mut self, module: &ModuleDetails, text: &str) -> Result<String> {
        let reply = self.local_request(module, &CommandRequest { text: text.to_string() }).await?;
        let response = CommandResponse::deserialize(&reply.serialize()?)?;
        Ok(response.text)
    }

    pub async fn issue_terminate_command(&mut self, module: &ModuleDetails) -> Result<()> {
        self.local_request(module, &TerminateRequest).await?;
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.remote.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use umps_modules::{LocalModuleService, ModuleProxy, PingSchedule, RemoteRegistry};

    #[tokio::test]
    async fn available_modules_then_local_command_round_trips() {
        let context = Context::new(1).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let registry = RemoteRegistry::new_arc(PingSchedule::new(vec![Duration::from_secs(60)]).unwrap());
        let mut proxy = ModuleProxy::spawn(
            &context,
            SocketOptions {
                address: "inproc://module-requestor-test".to_string(),
                connect_or_bind: ConnectOrBind::Bind,
                ..SocketOptions::default()
            },
            registry.clone(),
        )
        .unwrap();

        let table = Arc::new(umps_modules::LocalModuleTable::open(dir.path().join("modules.sqlite3")).unwrap());
        let mut service = LocalModuleService::spawn(
            &context,
            table,
            "picker",
            dir.path().to_str().unwrap(),
            0,
            vec!["ping".to_string()],
            Box::new(|text| text.to_uppercase()),
        )
        .unwrap();

        registry.register(
            ModuleDetails {
                name: "picker".to_string(),
                ipc_directory: Some(dir.path().to_str().unwrap().to_string()),
                ..ModuleDetails::default()
            },
            vec![b"fake-routing-id".to_vec()],
        );

        let mut requestor = ModuleRequestor::new(context.clone());
        requestor
            .initialize(SocketOptions {
                address: "inproc://module-requestor-test".to_string(),
                connect_or_bind: ConnectOrBind::Connect,
                ..SocketOptions::default()
            })
            .unwrap();

        let modules = requestor.get_available_modules().await.unwrap();
        assert_eq!(modules.len(), 1);
        let module = &modules[0];
        assert_eq!(module.name, "picker");

        let commands = requestor.get_commands(module).await.unwrap();
        assert_eq!(commands, vec!["ping".to_string()]);

        let text = requestor.issue_command(module, "hello").await.unwrap();
        assert_eq!(text, "HELLO");

        requestor.issue_terminate_command(module).await.unwrap();

        service.stop().await.ok();
        proxy.stop().await.unwrap();
    }
}
