//! Bridge and Marketplace contract ABIs
//!
//! Only the functions and events the bridge tooling consumes are declared.

// The sol! macro generates code that we can't document
#![allow(missing_docs)]

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};

use crate::{inscription::InscriptionId, BridgeResult};

sol! {
	/// Mints EVM tokens for inscriptions locked on Bitcoin.
	#[derive(Debug, PartialEq, Eq)]
	interface Bridge {
		/// Emitted when a bridged inscription has been minted.
		event OrdinalBridged(
			string inscriptionId,
			uint256 indexed tokenId,
			address indexed receiver
		);

		/// Mints the token representing `inscriptionId` to `receiver`.
		function mintBridgedOrdinal(
			address receiver,
			string inscriptionId,
			string metadata
		) external returns (uint256 tokenId);

		/// Inscription and metadata a token was minted for.
		function ordinalMetadata(uint256 tokenId)
			external
			view
			returns (string inscriptionId, string metadata);
	}

	/// Fixed-price order book for bridged tokens.
	#[derive(Debug, PartialEq, Eq)]
	interface Marketplace {
		event OrderCreated(
			uint256 indexed orderId,
			address indexed seller,
			address nftContract,
			uint256 tokenId,
			uint256 price
		);

		event OrderCancelled(uint256 indexed orderId);

		event OrderFilled(
			uint256 indexed orderId,
			address indexed buyer,
			uint256 price
		);

		event OfferPlaced(
			uint256 indexed orderId,
			address indexed bidder,
			uint256 price
		);

		function placeOrderForSell(
			address nftContract,
			uint256 tokenId,
			uint256 price
		) external returns (uint256 orderId);

		function buyNow(uint256 orderId) external payable;

		function cancelOrder(uint256 orderId) external;

		function placeOfferForOrder(uint256 orderId, uint256 price) external payable;
	}
}

/// Calldata of `Bridge.mintBridgedOrdinal`
pub fn mint_bridged_ordinal(
	receiver: Address,
	inscription_id: &InscriptionId,
	metadata: &str,
) -> Vec<u8> {
	Bridge::mintBridgedOrdinalCall {
		receiver,
		inscriptionId: inscription_id.to_string(),
		metadata: metadata.to_string(),
	}
	.abi_encode()
}

/// Calldata of `Bridge.ordinalMetadata`
pub fn ordinal_metadata(token_id: U256) -> Vec<u8> {
	Bridge::ordinalMetadataCall { tokenId: token_id }.abi_encode()
}

/// Decode the return data of `Bridge.ordinalMetadata` into the inscription id
/// and the metadata string
pub fn decode_ordinal_metadata(data: &[u8]) -> BridgeResult<(String, String)> {
	let Bridge::ordinalMetadataReturn {
		inscriptionId,
		metadata,
	} = Bridge::ordinalMetadataCall::abi_decode_returns(data, true)?;

	Ok((inscriptionId, metadata))
}

/// Calldata of `Marketplace.placeOrderForSell`
pub fn place_order_for_sell(nft_contract: Address, token_id: U256, price: U256) -> Vec<u8> {
	Marketplace::placeOrderForSellCall {
		nftContract: nft_contract,
		tokenId: token_id,
		price,
	}
	.abi_encode()
}

/// Calldata of `Marketplace.buyNow`
pub fn buy_now(order_id: U256) -> Vec<u8> {
	Marketplace::buyNowCall { orderId: order_id }.abi_encode()
}

/// Calldata of `Marketplace.cancelOrder`
pub fn cancel_order(order_id: U256) -> Vec<u8> {
	Marketplace::cancelOrderCall { orderId: order_id }.abi_encode()
}

/// Calldata of `Marketplace.placeOfferForOrder`
pub fn place_offer_for_order(order_id: U256, price: U256) -> Vec<u8> {
	Marketplace::placeOfferForOrderCall {
		orderId: order_id,
		price,
	}
	.abi_encode()
}
