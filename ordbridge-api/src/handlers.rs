//! Request handlers
//!
//! Every handler checks the required fields of its body and forwards the
//! request unchanged to the bridge listener. No business logic, ordering or
//! idempotency is applied here.
use std::str::FromStr;

use alloy_primitives::Address;
use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use ordbridge_core::inscription::InscriptionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{
	error::ProxyError,
	listener::{ListenerClient, Upstream},
};

/// State shared by the handlers
#[derive(Debug, Clone)]
pub struct AppState {
	/// Client of the bridge listener
	pub listener: ListenerClient,
}

/// Checks performed on a request body before it is forwarded
pub trait Validate {
	/// Wire names and values of the required fields
	fn required(&self) -> Vec<(&'static str, Option<&str>)>;

	/// Format checks of fields known to be present
	fn check_formats(&self) -> Result<(), ProxyError> {
		Ok(())
	}

	/// Reject bodies with missing, empty or malformed fields
	fn validate(&self) -> Result<(), ProxyError> {
		let missing: Vec<_> = self
			.required()
			.into_iter()
			.filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
			.map(|(name, _)| name)
			.collect();

		if !missing.is_empty() {
			return Err(ProxyError::MissingFields(missing));
		}

		self.check_formats()
	}
}

fn check_inscription_id(field: &'static str, value: &Option<String>) -> Result<(), ProxyError> {
	if let Some(value) = value {
		InscriptionId::from_str(value).map_err(|err| ProxyError::InvalidField {
			field,
			reason: err.to_string(),
		})?;
	}
	Ok(())
}

fn check_evm_address(field: &'static str, value: &Option<String>) -> Result<(), ProxyError> {
	if let Some(value) = value {
		Address::from_str(value).map_err(|err| ProxyError::InvalidField {
			field,
			reason: format!("{value} is not an EVM address: {err}"),
		})?;
	}
	Ok(())
}

fn check_txid(field: &'static str, value: &Option<String>) -> Result<(), ProxyError> {
	match value {
		Some(value) if value.len() != 64 || !value.chars().all(|c| c.is_ascii_hexdigit()) => {
			Err(ProxyError::InvalidField {
				field,
				reason: format!("{value} is not a transaction id"),
			})
		}
		_ => Ok(()),
	}
}

/// `POST /api/bridge/create-request`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBridgeRequest {
	/// Inscription to bridge
	pub inscription_id: Option<String>,
	/// EVM address of the user
	pub user_evm_address: Option<String>,
}

impl Validate for CreateBridgeRequest {
	fn required(&self) -> Vec<(&'static str, Option<&str>)> {
		vec![
			("inscriptionId", self.inscription_id.as_deref()),
			("userEvmAddress", self.user_evm_address.as_deref()),
		]
	}

	fn check_formats(&self) -> Result<(), ProxyError> {
		check_inscription_id("inscriptionId", &self.inscription_id)?;
		check_evm_address("userEvmAddress", &self.user_evm_address)
	}
}

/// `POST /api/bridge/initiate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateBridgeRequest {
	/// Bitcoin transaction sending the inscription to the bridge
	pub tx_id: Option<String>,
	/// Inscription being bridged
	pub inscription_id: Option<String>,
	/// Bitcoin sender
	pub from_address: Option<String>,
	/// EVM receiver
	pub receiver_address: Option<String>,
	/// Free-form inscription metadata
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Value>,
	/// Proof payload of the confirmed transaction
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub proof: Option<Value>,
	/// Calldata of the mint the listener submits
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mint_calldata: Option<String>,
}

impl Validate for InitiateBridgeRequest {
	fn required(&self) -> Vec<(&'static str, Option<&str>)> {
		vec![
			("txId", self.tx_id.as_deref()),
			("inscriptionId", self.inscription_id.as_deref()),
			("fromAddress", self.from_address.as_deref()),
			("receiverAddress", self.receiver_address.as_deref()),
		]
	}

	fn check_formats(&self) -> Result<(), ProxyError> {
		check_txid("txId", &self.tx_id)?;
		check_inscription_id("inscriptionId", &self.inscription_id)?;
		check_evm_address("receiverAddress", &self.receiver_address)
	}
}

/// `POST /api/htlc/create-ordinal-htlc`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHtlcRequest {
	/// Address the ordinal is released to
	pub recipient_address: Option<String>,
	/// Address the ordinal is refunded to after the timeout
	pub refund_address: Option<String>,
	/// Bitcoin address of the user
	pub btc_address: Option<String>,
	/// EVM address of the user
	pub user_evm_address: Option<String>,
}

impl Validate for CreateHtlcRequest {
	fn required(&self) -> Vec<(&'static str, Option<&str>)> {
		vec![
			("recipientAddress", self.recipient_address.as_deref()),
			("refundAddress", self.refund_address.as_deref()),
			("btcAddress", self.btc_address.as_deref()),
			("userEvmAddress", self.user_evm_address.as_deref()),
		]
	}

	fn check_formats(&self) -> Result<(), ProxyError> {
		check_evm_address("userEvmAddress", &self.user_evm_address)
	}
}

/// `POST /api/htlc/execute-refund`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRefundRequest {
	/// HTLC request to refund
	pub request_id: Option<String>,
	/// Where the refund goes
	pub destination_address: Option<String>,
}

impl Validate for ExecuteRefundRequest {
	fn required(&self) -> Vec<(&'static str, Option<&str>)> {
		vec![
			("requestId", self.request_id.as_deref()),
			("destinationAddress", self.destination_address.as_deref()),
		]
	}
}

async fn forward<T>(
	state: &AppState,
	segments: &[&str],
	body: Result<Json<T>, JsonRejection>,
) -> Result<Upstream, ProxyError>
where
	T: Validate + Serialize,
{
	let Json(request) = body?;
	request.validate()?;

	info!("Forwarding request to /{}", segments.join("/"));
	state.listener.post(segments, &request).await
}

/// Create a bridge request for an inscription
pub async fn create_bridge_request(
	State(state): State<AppState>,
	body: Result<Json<CreateBridgeRequest>, JsonRejection>,
) -> Result<Upstream, ProxyError> {
	forward(&state, &["bridge", "create-request"], body).await
}

/// Start bridging once the inscription transfer is confirmed
pub async fn initiate_bridge(
	State(state): State<AppState>,
	body: Result<Json<InitiateBridgeRequest>, JsonRejection>,
) -> Result<Upstream, ProxyError> {
	forward(&state, &["bridge", "initiate"], body).await
}

/// Create an HTLC locking an ordinal
pub async fn create_ordinal_htlc(
	State(state): State<AppState>,
	body: Result<Json<CreateHtlcRequest>, JsonRejection>,
) -> Result<Upstream, ProxyError> {
	forward(&state, &["htlc", "create-ordinal-htlc"], body).await
}

/// Refund an expired HTLC
pub async fn execute_refund(
	State(state): State<AppState>,
	body: Result<Json<ExecuteRefundRequest>, JsonRejection>,
) -> Result<Upstream, ProxyError> {
	forward(&state, &["htlc", "execute-refund"], body).await
}

/// Status of an HTLC request
pub async fn htlc_status(
	State(state): State<AppState>,
	Path(request_id): Path<String>,
) -> Result<Upstream, ProxyError> {
	if request_id.trim().is_empty() {
		return Err(ProxyError::MissingFields(vec!["requestId"]));
	}

	state.listener.get(&["htlc", "status", &request_id]).await
}

/// Fallback of known paths hit with another method
pub async fn method_not_allowed() -> ProxyError {
	ProxyError::MethodNotAllowed
}

/// Fallback of unknown paths
pub async fn not_found() -> ProxyError {
	ProxyError::NotFound
}
