//! Inspects and pokes modules registered in a local-module table (spec §4.7, §6).

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use umps_messages::modules::{
    AvailableCommandsResponse, CommandsRequest, TerminateRequest, TerminateResponse,
};
use umps_messages::registry::Registry;
use umps_messages::{Message, MessageType};
use umps_modules::LocalModuleTable;
use umps_transport::{ConnectOrBind, Context, Request, SocketOptions, TimeOut};

#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to the local-module sqlite table.
    #[arg(long)]
    table: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists every module registered in the table.
    List,
    /// Sends a `CommandsRequest` to a module and prints the commands it advertises.
    Ping { name: String },
    /// Sends a `TerminateRequest` to a module and prints the response.
    Terminate { name: String },
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

fn connect(address: &str) -> umps_base::error::Result<Request> {
    let context = Context::new(1)?;
    let mut request = Request::new();
    request.initialize(
        &context,
        SocketOptions {
            address: address.to_string(),
            connect_or_bind: ConnectOrBind::Connect,
            time_out: TimeOut::Bounded(REQUEST_TIMEOUT),
            ..SocketOptions::default()
        },
    )?;
    Ok(request)
}

async fn run(args: Args) -> umps_base::error::Result<()> {
    let table = LocalModuleTable::open(&args.table)?;

    match args.command {
        Command::List => {
            for row in table.list()? {
                println!("{}\t{}\t{}\t{}", row.name, row.pid, row.ipc_path, row.started_at);
            }
        }
        Command::Ping { name } => {
            let row = table
                .get(&name)?
                .ok_or_else(|| umps_base::error::Error::not_found(format!("module {name:?} not registered")))?;
            let mut request = connect(&format!("ipc://{}", row.ipc_path))?;
            let mut registry = Registry::new();
            registry.register::<AvailableCommandsResponse>();
            let reply = request.request(&CommandsRequest, &registry).await?;
            let response = AvailableCommandsResponse::deserialize(&reply.serialize()?)?;
            println!("{}", response.commands.join(", "));
        }
        Command::Terminate { name } => {
            let row = table
                .get(&name)?
                .ok_or_else(|| umps_base::error::Error::not_found(format!("module {name:?} not registered")))?;
            let mut request = connect(&format!("ipc://{}", row.ipc_path))?;
            let mut registry = Registry::new();
            registry.register::<TerminateResponse>();
            let reply = request.request(&TerminateRequest, &registry).await?;
            TerminateResponse::deserialize(&reply.serialize()?)?;
            println!("terminated {name}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    umps_cli::init_tracing();
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ulocalcommand: {error}");
            ExitCode::FAILURE
        }
    }
}
