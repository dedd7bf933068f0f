use alloy_primitives::Address;
use clap::{Parser, Subcommand};

use crate::{
	api_client::{ApiClient, CreateHtlcPayload},
	commands::utils,
	config::Config,
};

/// `ordbridge htlc` subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HtlcCommand {
	/// Create an HTLC locking an ordinal
	Create(CreateHtlcArgs),
	/// Refund an expired HTLC
	Refund(RefundArgs),
	/// Status of an HTLC request
	Status(HtlcStatusArgs),
}

/// Arguments of `ordbridge htlc create`
#[derive(Parser, Debug, Clone)]
pub struct CreateHtlcArgs {
	/// Address the ordinal is released to
	#[clap(long)]
	recipient_address: String,

	/// Address the ordinal is refunded to after the timeout
	#[clap(long)]
	refund_address: String,

	/// Bitcoin address of the user
	#[clap(long)]
	btc_address: String,

	/// EVM address of the user
	#[clap(long)]
	user_evm_address: Address,
}

/// Arguments of `ordbridge htlc refund`
#[derive(Parser, Debug, Clone)]
pub struct RefundArgs {
	/// HTLC request to refund
	#[clap(long)]
	request_id: String,

	/// Where the refund goes
	#[clap(long)]
	destination_address: String,
}

/// Arguments of `ordbridge htlc status`
#[derive(Parser, Debug, Clone)]
pub struct HtlcStatusArgs {
	/// HTLC request
	request_id: String,
}

/// Run an HTLC subcommand and print the answer of the listener
pub async fn htlc(config: &Config, command: &HtlcCommand) -> anyhow::Result<()> {
	let api = ApiClient::new(config.api_url.clone());

	let response = match command {
		HtlcCommand::Create(args) => {
			api.create_htlc(&CreateHtlcPayload {
				recipient_address: args.recipient_address.clone(),
				refund_address: args.refund_address.clone(),
				btc_address: args.btc_address.clone(),
				user_evm_address: args.user_evm_address,
			})
			.await?
		}
		HtlcCommand::Refund(args) => {
			api.execute_refund(&args.request_id, &args.destination_address)
				.await?
		}
		HtlcCommand::Status(args) => api.htlc_status(&args.request_id).await?,
	};

	utils::print_json(&response)
}
