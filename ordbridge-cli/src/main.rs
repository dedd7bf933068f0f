#![forbid(missing_docs)]

//! ordbridge is a tool that bridges Bitcoin inscriptions to EVM chains.
//!
//! It waits for the transfer of an inscription to the bridge to be confirmed,
//! forwards its proof to the bridge proxy and keeps track of the progress in
//! a local state file. It also drives the HTLC endpoints of the proxy and
//! encodes calldata for the bridge and marketplace contracts.
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ordbridge_cli::{
	commands::{
		bridge::{bridge, BridgeArgs},
		calldata::{calldata, CalldataCommand},
		htlc::{htlc, HtlcCommand},
		init::init,
		proof::{proof, ProofArgs},
		request::{create_request, RequestArgs},
		status::{clear, status},
	},
	config::{default_config_path, read_config},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
struct Cli {
	/// Path of the config file, defaults to ~/.config/ordbridge/config.toml
	#[clap(short, long, global = true, env = "ORDBRIDGE_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
	/// Write a config template
	Init,
	/// Register a bridge request for an inscription
	Request(RequestArgs),
	/// Wait for the transfer confirmations and bridge the inscription
	Bridge(BridgeArgs),
	/// Wait for a transaction and print its proof of inclusion
	Proof(ProofArgs),
	/// Print the current bridge state
	Status,
	/// Forget the current bridge state
	Clear,
	/// HTLC requests
	#[command(subcommand)]
	Htlc(HtlcCommand),
	/// Encode contract calldata
	#[command(subcommand)]
	Calldata(CalldataCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.with(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let args = Cli::parse();
	let config_path = match args.config {
		Some(path) => path,
		None => default_config_path()?,
	};

	match args.command {
		Command::Init => init(&config_path),
		Command::Calldata(command) => calldata(&command),
		Command::Request(request_args) => {
			create_request(&read_config(&config_path)?, &request_args).await
		}
		Command::Bridge(bridge_args) => bridge(&read_config(&config_path)?, &bridge_args).await,
		Command::Proof(proof_args) => proof(&read_config(&config_path)?, &proof_args).await,
		Command::Status => status(&read_config(&config_path)?),
		Command::Clear => clear(&read_config(&config_path)?),
		Command::Htlc(htlc_command) => htlc(&read_config(&config_path)?, &htlc_command).await,
	}
}
