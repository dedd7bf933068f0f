use alloy_primitives::{Address, U256};
use clap::Subcommand;
use ordbridge_core::{contracts, inscription::InscriptionId};
use serde_json::json;

use crate::commands::utils;

/// `ordbridge calldata` subcommands, one per consumed contract call
#[derive(Subcommand, Debug, Clone)]
pub enum CalldataCommand {
	/// `Bridge.mintBridgedOrdinal`
	Mint {
		/// Token receiver
		#[clap(long)]
		receiver: Address,
		/// Bridged inscription
		#[clap(long)]
		inscription_id: InscriptionId,
		/// Metadata string stored with the token
		#[clap(long, default_value = "")]
		metadata: String,
	},
	/// `Bridge.ordinalMetadata`
	Metadata {
		/// Bridged token
		token_id: U256,
	},
	/// `Marketplace.placeOrderForSell`
	Sell {
		/// Token contract
		#[clap(long)]
		nft_contract: Address,
		/// Token for sale
		#[clap(long)]
		token_id: U256,
		/// Asking price in wei
		#[clap(long)]
		price: U256,
	},
	/// `Marketplace.buyNow`
	Buy {
		/// Order to fill
		order_id: U256,
	},
	/// `Marketplace.cancelOrder`
	Cancel {
		/// Order to cancel
		order_id: U256,
	},
	/// `Marketplace.placeOfferForOrder`
	Offer {
		/// Order the offer is for
		#[clap(long)]
		order_id: U256,
		/// Offered price in wei
		#[clap(long)]
		price: U256,
	},
}

/// ABI-encode the call
pub fn encode(command: &CalldataCommand) -> Vec<u8> {
	match command {
		CalldataCommand::Mint {
			receiver,
			inscription_id,
			metadata,
		} => contracts::mint_bridged_ordinal(*receiver, inscription_id, metadata),
		CalldataCommand::Metadata { token_id } => contracts::ordinal_metadata(*token_id),
		CalldataCommand::Sell {
			nft_contract,
			token_id,
			price,
		} => contracts::place_order_for_sell(*nft_contract, *token_id, *price),
		CalldataCommand::Buy { order_id } => contracts::buy_now(*order_id),
		CalldataCommand::Cancel { order_id } => contracts::cancel_order(*order_id),
		CalldataCommand::Offer { order_id, price } => {
			contracts::place_offer_for_order(*order_id, *price)
		}
	}
}

/// Print the calldata of the call as `0x` hex
pub fn calldata(command: &CalldataCommand) -> anyhow::Result<()> {
	utils::print_json(&json!({
		"calldata": format!("0x{}", hex::encode(encode(command))),
	}))
}
