#![deny(missing_docs)]
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

use thiserror::Error;

/// Module for the Bridge and Marketplace contract ABIs
pub mod contracts;
/// Module for event-mirror records decoded from contract logs
pub mod events;
/// Module for inscription identifiers
pub mod inscription;
/// Module for the proof payload of a confirmed Bitcoin transaction
pub mod proof;
/// Module for the client-local bridge state
pub mod state;

pub use state::BridgeStatus;

#[derive(Error, Debug)]
/// Bridge error type
pub enum BridgeError {
	#[error("Invalid inscription id: {0}")]
	/// The inscription id is not of the form `<txid>i<index>`
	InvalidInscriptionId(String),
	#[error("Cannot move bridge state from {from} to {to}")]
	/// The requested status change is not allowed
	InvalidTransition {
		/// Current status
		from: BridgeStatus,
		/// Requested status
		to: BridgeStatus,
	},
	#[error("Malformed block header: {0}")]
	/// The proof carries a block header that cannot be decoded
	MalformedHeader(String),
	#[error("Could not encode or decode hex: {0}")]
	/// Hex encoding or decoding error
	BadHex(#[from] hex::FromHexError),
	#[error("ABI error: {0}")]
	/// Calldata or log decoding error
	Abi(#[from] alloy_sol_types::Error),
	#[error("Log is missing field {0}")]
	/// The raw log lacks a field the record needs
	IncompleteLog(&'static str),
	#[error("IO error: {0}")]
	/// State store IO error
	Io(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	/// State store serialization error
	Json(#[from] serde_json::Error),
}

/// A helper type for bridge results
pub type BridgeResult<T> = Result<T, BridgeError>;
