use alloy_primitives::Address;
use bitcoin::Txid;
use clap::Parser;
use ordbridge_core::{inscription::InscriptionId, BridgeStatus};
use serde_json::Value;

use crate::{commands::utils, config::Config, flow::BridgeRequest};

/// Arguments of `ordbridge bridge`
#[derive(Parser, Debug, Clone)]
pub struct BridgeArgs {
	/// Bitcoin transaction sending the inscription to the bridge
	#[clap(short, long)]
	tx_id: Txid,

	/// Inscription being bridged, `<txid>i<index>`
	#[clap(short, long)]
	inscription_id: InscriptionId,

	/// Bitcoin address the inscription is sent from
	#[clap(short, long)]
	from_address: String,

	/// EVM address that will receive the bridged token
	#[clap(short, long)]
	receiver_address: Address,

	/// Inscription metadata, as JSON
	#[clap(short, long, value_parser = utils::parse_json)]
	metadata: Option<Value>,
}

impl From<&BridgeArgs> for BridgeRequest {
	fn from(args: &BridgeArgs) -> Self {
		Self {
			tx_id: args.tx_id,
			inscription_id: args.inscription_id,
			from_address: args.from_address.clone(),
			receiver_address: args.receiver_address,
			metadata: args.metadata.clone(),
		}
	}
}

/// Wait for the transfer to be confirmed, forward its proof and print the
/// final bridge state. Exits with an error when the bridge failed.
pub async fn bridge(config: &Config, args: &BridgeArgs) -> anyhow::Result<()> {
	let mut client = utils::bridge_client(config);
	let state = client.bridge(args.into()).await?;

	utils::print_json(&state)?;

	if state.status == BridgeStatus::Failed {
		anyhow::bail!(
			"Bridge failed: {}",
			state.error.as_deref().unwrap_or("unknown error")
		);
	}

	Ok(())
}
