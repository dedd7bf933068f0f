use alloy_primitives::Address;
use ordbridge_core::{contracts, inscription::InscriptionId, proof::ProofData, state::BridgeState};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

/// Errors of the bridge proxy client
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
	/// The request did not get a response
	#[error("Could not reach the bridge API: {0}")]
	Transport(#[from] reqwest::Error),

	/// The proxy answered with an error status
	#[error("Bridge API returned {status}: {body}")]
	Status {
		/// HTTP status
		status: u16,
		/// JSON body of the response
		body: Value,
	},

	/// The configured API URL can not carry paths
	#[error("{0} cannot be used as a base URL")]
	Url(Url),
}

/// Body of `POST /api/bridge/initiate`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePayload {
	/// Bitcoin transaction sending the inscription to the bridge
	pub tx_id: String,
	/// Inscription being bridged
	pub inscription_id: InscriptionId,
	/// Bitcoin sender
	pub from_address: String,
	/// EVM receiver
	pub receiver_address: Address,
	/// Free-form inscription metadata
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Value>,
	/// Proof of inclusion of the transaction
	pub proof: ProofData,
	/// `mintBridgedOrdinal` calldata, hex
	pub mint_calldata: String,
}

impl InitiatePayload {
	/// Build the payload of a bridge whose proof has been generated
	pub fn new(
		state: &BridgeState,
		receiver_address: Address,
		metadata: Option<Value>,
		proof: ProofData,
	) -> Self {
		let metadata_string = metadata
			.as_ref()
			.map(Value::to_string)
			.unwrap_or_default();
		let calldata =
			contracts::mint_bridged_ordinal(receiver_address, &state.inscription_id, &metadata_string);

		Self {
			tx_id: state.tx_id.to_string(),
			inscription_id: state.inscription_id,
			from_address: state.from_address.clone(),
			receiver_address,
			metadata,
			proof,
			mint_calldata: format!("0x{}", hex::encode(calldata)),
		}
	}
}

/// Body of `POST /api/htlc/create-ordinal-htlc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHtlcPayload {
	/// Address the ordinal is released to
	pub recipient_address: String,
	/// Address the ordinal is refunded to after the timeout
	pub refund_address: String,
	/// Bitcoin address of the user
	pub btc_address: String,
	/// EVM address of the user
	pub user_evm_address: Address,
}

/// Client of the bridge proxy API
#[derive(Debug, Clone)]
pub struct ApiClient {
	http_client: reqwest::Client,
	base_url: Url,
}

impl ApiClient {
	/// Create a client of the proxy listening at `base_url`
	pub fn new(base_url: Url) -> Self {
		Self {
			http_client: reqwest::Client::new(),
			base_url,
		}
	}

	/// Register an inscription to bridge to `user_evm_address`
	pub async fn create_request(
		&self,
		inscription_id: &InscriptionId,
		user_evm_address: Address,
	) -> Result<Value, ClientError> {
		#[derive(Serialize)]
		#[serde(rename_all = "camelCase")]
		struct Body<'a> {
			inscription_id: &'a InscriptionId,
			user_evm_address: Address,
		}

		self.post(
			&["bridge", "create-request"],
			&Body {
				inscription_id,
				user_evm_address,
			},
		)
		.await
	}

	/// Forward the proof of a confirmed transfer
	pub async fn initiate(&self, payload: &InitiatePayload) -> Result<Value, ClientError> {
		self.post(&["bridge", "initiate"], payload).await
	}

	/// Create an HTLC locking an ordinal
	pub async fn create_htlc(&self, payload: &CreateHtlcPayload) -> Result<Value, ClientError> {
		self.post(&["htlc", "create-ordinal-htlc"], payload).await
	}

	/// Refund an expired HTLC to `destination_address`
	pub async fn execute_refund(
		&self,
		request_id: &str,
		destination_address: &str,
	) -> Result<Value, ClientError> {
		#[derive(Serialize)]
		#[serde(rename_all = "camelCase")]
		struct Body<'a> {
			request_id: &'a str,
			destination_address: &'a str,
		}

		self.post(
			&["htlc", "execute-refund"],
			&Body {
				request_id,
				destination_address,
			},
		)
		.await
	}

	/// Status of an HTLC request
	pub async fn htlc_status(&self, request_id: &str) -> Result<Value, ClientError> {
		let url = self.url(&["htlc", "status", request_id])?;
		trace!("GET {}", url);

		self.send(self.http_client.get(url)).await
	}

	fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
		let mut url = self.base_url.clone();

		url.path_segments_mut()
			.map_err(|_| ClientError::Url(self.base_url.clone()))?
			.pop_if_empty()
			.push("api")
			.extend(segments);

		Ok(url)
	}

	async fn post<T: Serialize + ?Sized>(
		&self,
		segments: &[&str],
		body: &T,
	) -> Result<Value, ClientError> {
		let url = self.url(segments)?;
		trace!("POST {}", url);

		self.send(self.http_client.post(url).json(body)).await
	}

	async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ClientError> {
		let response = request.send().await?;
		let status = response.status();
		let text = response.text().await?;

		let body = if text.trim().is_empty() {
			Value::Null
		} else {
			serde_json::from_str(&text).unwrap_or(Value::String(text))
		};

		debug!("Bridge API answered {}", status);

		if !status.is_success() {
			return Err(ClientError::Status {
				status: status.as_u16(),
				body,
			});
		}

		Ok(body)
	}
}

#[cfg(test)]
mod tests {
	use std::str::FromStr;

	use alloy_sol_types::SolCall;
	use bitcoin::Txid;
	use chrono::Utc;
	use mockito::Matcher;
	use serde_json::json;

	use super::*;

	const TXID: &str = "5e3ff01a8202a85ccf65e64bb026d2bbcb2f1b0da7df16e1bfff63903f80f309";
	const INSCRIPTION: &str =
		"6fb976ab49dcec017f1e201e84395983204ae1a7c2abf7ced0a85d692e442799i0";

	fn client(server: &mockito::Server) -> ApiClient {
		ApiClient::new(Url::parse(&server.url()).unwrap())
	}

	#[tokio::test]
	async fn should_post_create_request() {
		let mut server = mockito::Server::new_async().await;
		let mock = server
			.mock("POST", "/api/bridge/create-request")
			.match_body(Matcher::Json(json!({
				"inscriptionId": INSCRIPTION,
				"userEvmAddress": "0x1111111111111111111111111111111111111111",
			})))
			.with_status(201)
			.with_body(r#"{"requestId":"req-1"}"#)
			.create_async()
			.await;

		let response = client(&server)
			.create_request(&INSCRIPTION.parse().unwrap(), Address::repeat_byte(0x11))
			.await
			.unwrap();

		mock.assert_async().await;
		assert_eq!(response["requestId"], "req-1");
	}

	#[tokio::test]
	async fn should_surface_error_status_with_body() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/api/htlc/execute-refund")
			.with_status(500)
			.with_body(r#"{"error":"Bridge listener service is not running"}"#)
			.create_async()
			.await;

		let err = client(&server)
			.execute_refund("req-1", "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq")
			.await
			.unwrap_err();

		let ClientError::Status { status, body } = err else {
			panic!("expected an error status, got {err:?}");
		};
		assert_eq!(status, 500);
		assert_eq!(body["error"], "Bridge listener service is not running");
	}

	#[tokio::test]
	async fn should_get_htlc_status_under_base_path() {
		let mut server = mockito::Server::new_async().await;
		let mock = server
			.mock("GET", "/proxy/api/htlc/status/req-7")
			.with_body(r#"{"status":"locked"}"#)
			.create_async()
			.await;

		let client = ApiClient::new(Url::parse(&format!("{}/proxy/", server.url())).unwrap());
		let response = client.htlc_status("req-7").await.unwrap();

		mock.assert_async().await;
		assert_eq!(response, json!({"status": "locked"}));
	}

	#[test]
	fn initiate_payload_carries_mint_calldata() {
		let txid = Txid::from_str(TXID).unwrap();
		let state = BridgeState::new(
			txid,
			INSCRIPTION.parse().unwrap(),
			"bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
			"0x2222222222222222222222222222222222222222",
			Utc::now(),
		);

		let payload = InitiatePayload::new(
			&state,
			Address::repeat_byte(0x22),
			Some(json!({"name": "Ordinal #1"})),
			ProofData::placeholder(txid),
		);

		let calldata = hex::decode(payload.mint_calldata.trim_start_matches("0x")).unwrap();
		let call =
			contracts::Bridge::mintBridgedOrdinalCall::abi_decode(&calldata, true).unwrap();
		assert_eq!(call.receiver, Address::repeat_byte(0x22));
		assert_eq!(call.inscriptionId, INSCRIPTION);
		assert_eq!(call.metadata, r#"{"name":"Ordinal #1"}"#);

		let json = serde_json::to_value(&payload).unwrap();
		assert_eq!(json["txId"], TXID);
		assert_eq!(json["proof"]["txid"], TXID);
		assert_eq!(json["receiverAddress"], "0x2222222222222222222222222222222222222222");
	}
}
