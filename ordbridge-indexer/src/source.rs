//! Sources of contract logs
use std::{
	collections::HashMap,
	fmt::Debug,
	sync::Mutex,
	time::Duration,
};

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use serde::{de::DeserializeOwned, de::Error as _, Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::{trace, warn};
use url::Url;

/// A log as returned by `eth_getLogs`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
	/// Emitting contract
	pub address: Address,
	/// Indexed topics, the event signature hash first
	pub topics: Vec<B256>,
	/// ABI-encoded non-indexed fields
	pub data: Bytes,
	/// Block of the log, missing for pending logs
	#[serde(default, deserialize_with = "deserialize_optional_quantity")]
	pub block_number: Option<u64>,
	/// Emitting transaction, missing for pending logs
	#[serde(default)]
	pub transaction_hash: Option<B256>,
	/// Position of the log in the block, missing for pending logs
	#[serde(default, deserialize_with = "deserialize_optional_quantity")]
	pub log_index: Option<u64>,
	/// Set when the log was dropped by a chain reorganization
	#[serde(default)]
	pub removed: bool,
}

/// Source of contract logs
#[async_trait]
pub trait LogSource: Send + Sync + Debug {
	/// Number of the chain head
	async fn latest_block(&self) -> anyhow::Result<u64>;

	/// Logs emitted by `addresses` in the inclusive block range whose first
	/// topic is one of `topics`
	async fn logs(
		&self,
		from: u64,
		to: u64,
		addresses: &[Address],
		topics: &[B256],
	) -> anyhow::Result<Vec<Log>>;

	/// Timestamp of a block, seconds since the epoch
	async fn block_timestamp(&self, number: u64) -> anyhow::Result<u64>;
}

/// Errors returned by the node
#[derive(thiserror::Error, Debug)]
pub enum RpcError {
	/// The node answered with a JSON-RPC error
	#[error("JSON-RPC error {code}: {message}")]
	Response {
		/// Error code
		code: i64,
		/// Error message
		message: String,
	},
	/// The requested block is unknown to the node
	#[error("Block {0} not found")]
	MissingBlock(u64),
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
	#[serde(deserialize_with = "deserialize_quantity")]
	timestamp: u64,
}

const DEFAULT_MAX_RETRY_ELAPSED: Duration = Duration::from_secs(30);

/// Log source backed by the JSON-RPC API of an EVM node
#[derive(Debug)]
pub struct JsonRpcLogSource {
	http_client: reqwest::Client,
	url: Url,
	max_retry_elapsed: Duration,
	timestamps: Mutex<HashMap<u64, u64>>,
}

impl JsonRpcLogSource {
	/// Create a source querying the node at `url`
	pub fn new(url: Url) -> Self {
		Self {
			http_client: reqwest::Client::new(),
			url,
			max_retry_elapsed: DEFAULT_MAX_RETRY_ELAPSED,
			timestamps: Mutex::new(HashMap::new()),
		}
	}

	/// Bound the time spent retrying a single call
	pub fn with_max_retry_elapsed(mut self, max_retry_elapsed: Duration) -> Self {
		self.max_retry_elapsed = max_retry_elapsed;
		self
	}

	async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> anyhow::Result<T> {
		let body = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": method,
			"params": params,
		});

		let operation = || async {
			trace!("Calling {}", method);

			let response = self
				.http_client
				.post(self.url.clone())
				.json(&body)
				.send()
				.await
				.map_err(|err| {
					if err.is_connect() || err.is_timeout() {
						backoff::Error::transient(anyhow::Error::from(err))
					} else {
						backoff::Error::permanent(anyhow::Error::from(err))
					}
				})?;

			if response.status().is_server_error() {
				return Err(backoff::Error::transient(anyhow::anyhow!(
					"Node answered {} to {}",
					response.status(),
					method
				)));
			}

			response
				.json::<RpcResponse>()
				.await
				.map_err(|err| backoff::Error::permanent(anyhow::Error::from(err)))
		};

		let notify = |err, duration| {
			warn!("Retrying {} in {:?} after error: {:?}", method, duration, err);
		};

		let backoff = ExponentialBackoff {
			max_elapsed_time: Some(self.max_retry_elapsed),
			..Default::default()
		};

		let response = retry_notify(backoff, operation, notify).await?;

		if let Some(RpcErrorObject { code, message }) = response.error {
			return Err(RpcError::Response { code, message }.into());
		}

		Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
	}
}

#[async_trait]
impl LogSource for JsonRpcLogSource {
	async fn latest_block(&self) -> anyhow::Result<u64> {
		let number: String = self.call("eth_blockNumber", json!([])).await?;

		Ok(parse_quantity(&number)?)
	}

	#[tracing::instrument(skip(self, addresses, topics))]
	async fn logs(
		&self,
		from: u64,
		to: u64,
		addresses: &[Address],
		topics: &[B256],
	) -> anyhow::Result<Vec<Log>> {
		self.call(
			"eth_getLogs",
			json!([{
				"fromBlock": format!("{from:#x}"),
				"toBlock": format!("{to:#x}"),
				"address": addresses,
				"topics": [topics],
			}]),
		)
		.await
	}

	async fn block_timestamp(&self, number: u64) -> anyhow::Result<u64> {
		if let Some(timestamp) = self.cached_timestamp(number) {
			return Ok(timestamp);
		}

		let block: Option<BlockHeader> = self
			.call("eth_getBlockByNumber", json!([format!("{number:#x}"), false]))
			.await?;
		let timestamp = block.ok_or(RpcError::MissingBlock(number))?.timestamp;

		if let Ok(mut timestamps) = self.timestamps.lock() {
			timestamps.insert(number, timestamp);
		}

		Ok(timestamp)
	}
}

impl JsonRpcLogSource {
	fn cached_timestamp(&self, number: u64) -> Option<u64> {
		self.timestamps.lock().ok()?.get(&number).copied()
	}
}

fn parse_quantity(text: &str) -> Result<u64, std::num::ParseIntError> {
	u64::from_str_radix(text.trim_start_matches("0x"), 16)
}

fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	let buf = String::deserialize(deserializer)?;
	parse_quantity(&buf).map_err(D::Error::custom)
}

fn deserialize_optional_quantity<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
	D: Deserializer<'de>,
{
	Option::<String>::deserialize(deserializer)?
		.map(|buf| parse_quantity(&buf).map_err(D::Error::custom))
		.transpose()
}

#[cfg(test)]
mod tests {
	use mockito::Matcher;

	use super::*;

	fn source(server: &mockito::Server) -> JsonRpcLogSource {
		JsonRpcLogSource::new(Url::parse(&server.url()).unwrap())
			.with_max_retry_elapsed(Duration::from_millis(10))
	}

	#[tokio::test]
	async fn should_parse_hex_block_number() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/")
			.match_body(Matcher::PartialJson(json!({"method": "eth_blockNumber"})))
			.with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x1b4"}"#)
			.create_async()
			.await;

		assert_eq!(source(&server).latest_block().await.unwrap(), 436);
	}

	#[tokio::test]
	async fn should_request_logs_for_range_and_addresses() {
		let mut server = mockito::Server::new_async().await;
		let address = Address::repeat_byte(0x42);
		let topic = B256::repeat_byte(1);
		let mock = server
			.mock("POST", "/")
			.match_body(Matcher::PartialJson(json!({
				"method": "eth_getLogs",
				"params": [{"fromBlock": "0xa", "toBlock": "0x14", "topics": [[topic]]}],
			})))
			.with_body(
				json!({
					"jsonrpc": "2.0",
					"id": 1,
					"result": [{
						"address": address,
						"topics": [B256::repeat_byte(1)],
						"data": "0x",
						"blockNumber": "0xc",
						"transactionHash": B256::repeat_byte(2),
						"logIndex": "0x3",
						"removed": false
					}]
				})
				.to_string(),
			)
			.create_async()
			.await;

		let logs = source(&server)
			.logs(10, 20, &[address], &[topic])
			.await
			.unwrap();

		mock.assert_async().await;
		assert_eq!(logs.len(), 1);
		assert_eq!(logs[0].address, address);
		assert_eq!(logs[0].block_number, Some(12));
		assert_eq!(logs[0].log_index, Some(3));
		assert!(!logs[0].removed);
	}

	#[tokio::test]
	async fn should_surface_rpc_errors() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/")
			.with_body(
				r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"query returned more than 10000 results"}}"#,
			)
			.create_async()
			.await;

		let err = source(&server)
			.logs(0, 1_000_000, &[], &[])
			.await
			.unwrap_err();

		assert!(matches!(
			err.downcast_ref::<RpcError>(),
			Some(RpcError::Response { code: -32005, .. })
		));
	}

	#[tokio::test]
	async fn should_cache_block_timestamps() {
		let mut server = mockito::Server::new_async().await;
		let mock = server
			.mock("POST", "/")
			.match_body(Matcher::PartialJson(json!({
				"method": "eth_getBlockByNumber",
				"params": ["0x64", false],
			})))
			.with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"number":"0x64","timestamp":"0x6553f100"}}"#)
			.expect(1)
			.create_async()
			.await;

		let source = source(&server);

		assert_eq!(source.block_timestamp(100).await.unwrap(), 1_700_000_000);
		assert_eq!(source.block_timestamp(100).await.unwrap(), 1_700_000_000);
		mock.assert_async().await;
	}

	#[tokio::test]
	async fn unknown_block_is_an_error() {
		let mut server = mockito::Server::new_async().await;
		server
			.mock("POST", "/")
			.with_body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
			.create_async()
			.await;

		let err = source(&server).block_timestamp(7).await.unwrap_err();

		assert!(matches!(
			err.downcast_ref::<RpcError>(),
			Some(RpcError::MissingBlock(7))
		));
	}

	#[test]
	fn pending_logs_have_no_position() {
		let log: Log = serde_json::from_value(json!({
			"address": Address::ZERO,
			"topics": [],
			"data": "0x",
			"blockNumber": null,
			"transactionHash": null,
			"logIndex": null
		}))
		.unwrap();

		assert_eq!(log.block_number, None);
		assert_eq!(log.log_index, None);
	}
}
