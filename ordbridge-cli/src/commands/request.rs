use alloy_primitives::Address;
use clap::Parser;
use ordbridge_core::inscription::InscriptionId;

use crate::{api_client::ApiClient, commands::utils, config::Config};

/// Arguments of `ordbridge request`
#[derive(Parser, Debug, Clone)]
pub struct RequestArgs {
	/// Inscription to bridge, `<txid>i<index>`
	#[clap(short, long)]
	inscription_id: InscriptionId,

	/// EVM address that will receive the bridged token
	#[clap(short, long)]
	user_evm_address: Address,
}

/// Register a bridge request and print the answer of the listener, which
/// tells where to send the inscription
pub async fn create_request(config: &Config, args: &RequestArgs) -> anyhow::Result<()> {
	let response = ApiClient::new(config.api_url.clone())
		.create_request(&args.inscription_id, args.user_evm_address)
		.await?;

	utils::print_json(&response)
}
