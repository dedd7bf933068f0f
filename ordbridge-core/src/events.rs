//! Event-mirror records
//!
//! Records are flat, append-only projections of contract logs. The only
//! invariant across records is the uniqueness of their id, built from the
//! transaction hash and the log index.
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};

use crate::{
	contracts::{Bridge, Marketplace},
	BridgeResult,
};

/// Contract a log is mirrored from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
	/// The ordinal bridge
	Bridge,
	/// The marketplace
	Marketplace,
}

/// Event-specific fields of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum EventPayload {
	/// `Bridge.OrdinalBridged`
	#[serde(rename_all = "camelCase")]
	OrdinalBridged {
		/// Bridged inscription
		inscription_id: String,
		/// Minted token
		token_id: U256,
		/// Token receiver
		receiver: Address,
	},
	/// `Marketplace.OrderCreated`
	#[serde(rename_all = "camelCase")]
	OrderCreated {
		/// New order
		order_id: U256,
		/// Seller
		seller: Address,
		/// Token contract
		nft_contract: Address,
		/// Token for sale
		token_id: U256,
		/// Asking price in wei
		price: U256,
	},
	/// `Marketplace.OrderCancelled`
	#[serde(rename_all = "camelCase")]
	OrderCancelled {
		/// Cancelled order
		order_id: U256,
	},
	/// `Marketplace.OrderFilled`
	#[serde(rename_all = "camelCase")]
	OrderFilled {
		/// Filled order
		order_id: U256,
		/// Buyer
		buyer: Address,
		/// Paid price in wei
		price: U256,
	},
	/// `Marketplace.OfferPlaced`
	#[serde(rename_all = "camelCase")]
	OfferPlaced {
		/// Order the offer is for
		order_id: U256,
		/// Bidder
		bidder: Address,
		/// Offered price in wei
		price: U256,
	},
}

impl EventPayload {
	/// Name of the contract event
	pub fn event_name(&self) -> &'static str {
		match self {
			Self::OrdinalBridged { .. } => "OrdinalBridged",
			Self::OrderCreated { .. } => "OrderCreated",
			Self::OrderCancelled { .. } => "OrderCancelled",
			Self::OrderFilled { .. } => "OrderFilled",
			Self::OfferPlaced { .. } => "OfferPlaced",
		}
	}

	/// Decode a log emitted by a contract of the given kind. Returns `None`
	/// when the first topic is not an event of that contract.
	pub fn decode(
		kind: ContractKind,
		topics: &[B256],
		data: &[u8],
	) -> Option<BridgeResult<Self>> {
		let topic0 = *topics.first()?;

		let payload = match kind {
			ContractKind::Bridge => decode_bridge(topic0, topics, data)?,
			ContractKind::Marketplace => decode_marketplace(topic0, topics, data)?,
		};

		Some(payload.map_err(Into::into))
	}
}

/// Topic hashes of the events mirrored for a contract kind
pub fn mirrored_topics(kind: ContractKind) -> Vec<B256> {
	match kind {
		ContractKind::Bridge => vec![Bridge::OrdinalBridged::SIGNATURE_HASH],
		ContractKind::Marketplace => vec![
			Marketplace::OrderCreated::SIGNATURE_HASH,
			Marketplace::OrderCancelled::SIGNATURE_HASH,
			Marketplace::OrderFilled::SIGNATURE_HASH,
			Marketplace::OfferPlaced::SIGNATURE_HASH,
		],
	}
}

fn decode_bridge(
	topic0: B256,
	topics: &[B256],
	data: &[u8],
) -> Option<alloy_sol_types::Result<EventPayload>> {
	if topic0 != Bridge::OrdinalBridged::SIGNATURE_HASH {
		return None;
	}

	Some(
		Bridge::OrdinalBridged::decode_raw_log(topics.iter().copied(), data, true)
			.map(|event| EventPayload::OrdinalBridged {
				inscription_id: event.inscriptionId,
				token_id: event.tokenId,
				receiver: event.receiver,
			}),
	)
}

fn decode_marketplace(
	topic0: B256,
	topics: &[B256],
	data: &[u8],
) -> Option<alloy_sol_types::Result<EventPayload>> {
	let topics = topics.iter().copied();

	let payload = if topic0 == Marketplace::OrderCreated::SIGNATURE_HASH {
		Marketplace::OrderCreated::decode_raw_log(topics, data, true).map(|event| {
			EventPayload::OrderCreated {
				order_id: event.orderId,
				seller: event.seller,
				nft_contract: event.nftContract,
				token_id: event.tokenId,
				price: event.price,
			}
		})
	} else if topic0 == Marketplace::OrderCancelled::SIGNATURE_HASH {
		Marketplace::OrderCancelled::decode_raw_log(topics, data, true)
			.map(|event| EventPayload::OrderCancelled { order_id: event.orderId })
	} else if topic0 == Marketplace::OrderFilled::SIGNATURE_HASH {
		Marketplace::OrderFilled::decode_raw_log(topics, data, true).map(|event| {
			EventPayload::OrderFilled {
				order_id: event.orderId,
				buyer: event.buyer,
				price: event.price,
			}
		})
	} else if topic0 == Marketplace::OfferPlaced::SIGNATURE_HASH {
		Marketplace::OfferPlaced::decode_raw_log(topics, data, true).map(|event| {
			EventPayload::OfferPlaced {
				order_id: event.orderId,
				bidder: event.bidder,
				price: event.price,
			}
		})
	} else {
		return None;
	};

	Some(payload)
}

/// A contract log mirrored as a flat row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
	/// `<transaction hash>-<log index>`
	pub id: String,
	/// Block the log was emitted in
	pub block_number: u64,
	/// Timestamp of that block, seconds since the epoch
	pub block_timestamp: u64,
	/// Emitting transaction
	pub transaction_hash: B256,
	/// Position of the log in the block
	pub log_index: u64,
	/// Emitting contract
	pub contract_address: Address,
	/// Kind of the emitting contract
	pub contract: ContractKind,
	/// Name of the event
	pub event_name: String,
	/// Event-specific fields
	pub payload: EventPayload,
}

impl EventRecord {
	/// Build a record, deriving its id and event name
	pub fn new(
		block_number: u64,
		block_timestamp: u64,
		transaction_hash: B256,
		log_index: u64,
		contract_address: Address,
		contract: ContractKind,
		payload: EventPayload,
	) -> Self {
		Self {
			id: record_id(&transaction_hash, log_index),
			block_number,
			block_timestamp,
			transaction_hash,
			log_index,
			contract_address,
			contract,
			event_name: payload.event_name().to_string(),
			payload,
		}
	}
}

/// Id of the record mirroring the given log
pub fn record_id(transaction_hash: &B256, log_index: u64) -> String {
	format!("{transaction_hash}-{log_index}")
}
