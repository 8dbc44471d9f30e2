//! Generates a Curve-style keypair and writes it to two files (spec §6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use umps_auth::KeyPair;

#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(long)]
    publickey: PathBuf,
    #[arg(long)]
    privatekey: PathBuf,
    #[arg(long)]
    keyname: String,
}

fn main() -> ExitCode {
    umps_cli::init_tracing();
    let args = Args::parse();

    let keypair = match KeyPair::create(args.keyname) {
        Ok(keypair) => keypair,
        Err(error) => {
            eprintln!("ukeypair: {error}");
            return ExitCode::FAILURE;
        }
    };

    match keypair.to_files(&args.publickey, &args.privatekey) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ukeypair: {error}");
            ExitCode::FAILURE
        }
    }
}
