//! The local command plane (spec §4.7): one REPLY socket per module, bound at a deterministic
//! `ipc://` path, answering `CommandsRequest`/`CommandRequest`/`TerminateRequest`.

use std::sync::Arc;

use umps_base::error::Result;
use umps_base::task::{Cancel, JoinGuard};
use umps_messages::details::sanitize_module_name;
use umps_messages::modules::{
    AvailableCommandsResponse, CommandRequest, CommandResponse, CommandsRequest, TerminateRequest,
    TerminateResponse,
};
use umps_messages::registry::Registry;
use umps_messages::{Message, MessageType};
use umps_transport::{ConnectOrBind, Context, Reply, ReplyCallback, SocketOptions};

use crate::table::LocalModuleTable;

/// Answers a single `CommandRequest`'s free-form text with the module's own reply text.
pub type CommandHandler = Box<dyn Fn(&str) -> String + Send + Sync>;

fn request_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register::<CommandsRequest>();
    registry.register::<CommandRequest>();
    registry.register::<TerminateRequest>();
    registry
}

fn handle(type_tag: &str, body: &[u8], commands: &[String], handler: &CommandHandler, cancel: &Cancel) -> Box<dyn Message> {
    match type_tag {
        "CommandsRequest" => Box::new(AvailableCommandsResponse { commands: commands.to_vec() }),
        "CommandRequest" => match CommandRequest::deserialize(body) {
            Ok(request) => Box::new(CommandResponse { text: handler(&request.text) }),
            Err(_) => Box::new(CommandResponse { text: String::new() }),
        },
        "TerminateRequest" => {
            cancel.set();
            Box::new(TerminateResponse)
        }
        _ => Box::new(AvailableCommandsResponse { commands: Vec::new() }),
    }
}

/// Owns one module's local command socket and its row in the [`LocalModuleTable`].
pub struct LocalModuleService {
    guard: JoinGuard<Result<()>>,
    ipc_path: String,
    module_name: String,
    table: Arc<LocalModuleTable>,
}

impl LocalModuleService {
    /// `ipc_directory` is the directory the `<sanitized_name>.ipc` socket path is derived from
    /// (spec §6). `started_at` is a caller-supplied epoch-seconds timestamp, since this crate
    /// never calls a wall-clock function itself.
    pub fn spawn(
        context: &Context,
        table: Arc<LocalModuleTable>,
        module_name: &str,
        ipc_directory: &str,
        started_at: i64,
        commands: Vec<String>,
        handler: CommandHandler,
    ) -> Result<Self> {
        let ipc_path = format!("{ipc_directory}/{}.ipc", sanitize_module_name(module_name));

        let mut reply = Reply::new();
        reply.initialize(
            context,
            SocketOptions {
                address: format!("ipc://{ipc_path}"),
                connect_or_bind: ConnectOrBind::Bind,
                ..SocketOptions::default()
            },
        )?;

        table.register(module_name, std::process::id(), &ipc_path, started_at)?;

        let guard = JoinGuard::spawn(move |cancel| async move {
            let wire_registry = request_registry();
            let callback_cancel = cancel.clone();
            let callback: ReplyCallback =
                Box::new(move |type_tag, body| handle(type_tag, body, &commands, &handler, &callback_cancel));
            reply.serve(&wire_registry, &callback, &cancel).await
        });

        Ok(Self {
            guard,
            ipc_path,
            module_name: module_name.to_string(),
            table,
        })
    }

    pub fn ipc_path(&self) -> &str {
        &self.ipc_path
    }

    /// Stops the socket thread and removes the module's table row and IPC path (spec §4.7:
    /// "Deregistration removes the row and the IPC path").
    pub async fn stop(&mut self) -> Result<()> {
        let result = match self.guard.shutdown().await {
            Ok(result) => result,
            Err(_) => Ok(()),
        };
        self.table.deregister(&self.module_name)?;
        let _ = std::fs::remove_file(&self.ipc_path);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umps_messages::modules::AvailableCommandsResponse as Ack;
    use umps_transport::Request;

    #[tokio::test]
    async fn commands_request_lists_registered_commands() {
        let dir = tempfile::tempdir().unwrap();
        let table = Arc::new(LocalModuleTable::open(dir.path().join("modules.sqlite3")).unwrap());
        let context = Context::new(1).unwrap();

        let mut service = LocalModuleService::spawn(
            &context,
            table.clone(),
            "picker",
            dir.path().to_str().unwrap(),
            0,
            vec!["ping".to_string()],
            Box::new(|text| text.to_uppercase()),
        )
        .unwrap();

        assert!(table.get("picker").unwrap().is_some());

        let mut client = Request::new();
        client
            .initialize(
                &context,
                SocketOptions {
                    address: format!("ipc://{}", service.ipc_path()),
                    connect_or_bind: ConnectOrBind::Connect,
                    ..SocketOptions::default()
                },
            )
            .unwrap();

        let mut registry = Registry::new();
        registry.register::<Ack>();
        let reply = client.request(&CommandsRequest, &registry).await.unwrap();
        let commands = Ack::deserialize(&reply.serialize().unwrap()).unwrap();
        assert_eq!(commands.commands, vec!["ping".to_string()]);

        service.stop().await.unwrap();
        assert!(table.get("picker").unwrap().is_none());
    }

    #[tokio::test]
    async fn command_request_runs_the_handler() {
        let dir = tempfile::tempdir().unwrap();
        let table = Arc::new(LocalModuleTable::open(dir.path().join("modules.sqlite3")).unwrap());
        let context = Context::new(1).unwrap();

        let mut service = LocalModuleService::spawn(
            &context,
            table,
            "picker",
            dir.path().to_str().unwrap(),
            0,
            Vec::new(),
            Box::new(|text| text.to_uppercase()),
        )
        .unwrap();

        let mut client = Request::new();
        client
            .initialize(
                &context,
                SocketOptions {
                    address: format!("ipc://{}", service.ipc_path()),
                    connect_or_bind: ConnectOrBind::Connect,
                    ..SocketOptions::default()
                },
            )
            .unwrap();

        let mut registry = Registry::new();
        registry.register::<CommandResponse>();
        let reply = client
            .request(&CommandRequest { text: "hello".to_string() }, &registry)
            .await
            .unwrap();
        let response = CommandResponse::deserialize(&reply.serialize().unwrap()).unwrap();
        assert_eq!(response.text, "HELLO");

        service.stop().await.unwrap();
    }
}
