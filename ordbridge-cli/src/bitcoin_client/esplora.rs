//! Esplora Bitcoin client

use std::{str::FromStr, time::Duration};

use anyhow::anyhow;
use async_trait::async_trait;
use bitcoin::{consensus::encode::deserialize, BlockHash, BlockHeader, TxMerkleNode, Txid};
use ordbridge_core::proof::ProofData;
use reqwest::{Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{trace, warn};
use url::Url;

use super::BitcoinClient;

const DEFAULT_MAX_RETRY_ELAPSED: Duration = Duration::from_secs(30);

/// Facilitates communication with a Bitcoin esplora server
#[derive(Debug, Clone)]
pub struct EsploraClient {
	http_client: reqwest::Client,
	rest_url: String,
	max_retry_elapsed: Duration,
}

#[derive(Debug, Deserialize)]
struct TxStatus {
	confirmed: bool,
	block_height: Option<u32>,
	block_hash: Option<BlockHash>,
}

#[derive(Debug, Deserialize)]
struct MerkleProof {
	block_height: u32,
	merkle: Vec<String>,
	pos: u32,
}

impl EsploraClient {
	/// Create Esplora Bitcoin client
	pub fn new(url: &Url) -> Self {
		Self {
			http_client: reqwest::Client::new(),
			rest_url: url.as_str().trim_end_matches('/').to_string(),
			max_retry_elapsed: DEFAULT_MAX_RETRY_ELAPSED,
		}
	}

	/// Bound the time spent retrying a single request
	pub fn with_max_retry_elapsed(mut self, max_retry_elapsed: Duration) -> Self {
		self.max_retry_elapsed = max_retry_elapsed;
		self
	}

	async fn get(&self, path: &str) -> anyhow::Result<Option<Response>> {
		let url = format!("{}/{}", self.rest_url, path);

		let operation = || async {
			let response = self.http_client.get(&url).send().await.map_err(|err| {
				if err.is_connect() || err.is_timeout() {
					backoff::Error::transient(anyhow!(err))
				} else {
					backoff::Error::permanent(anyhow!(err))
				}
			})?;

			match response.status() {
				StatusCode::NOT_FOUND => Ok(None),
				status if status.is_server_error() => Err(backoff::Error::transient(anyhow!(
					"Request to {} failed with {}",
					url,
					status
				))),
				status if !status.is_success() => Err(backoff::Error::permanent(anyhow!(
					"Request to {} failed with {}",
					url,
					status
				))),
				_ => Ok(Some(response)),
			}
		};

		let notify = |err: anyhow::Error, duration: Duration| {
			trace!("Retrying in {:?} after error: {:?}", duration, err);
		};

		let backoff = backoff::ExponentialBackoff {
			max_elapsed_time: Some(self.max_retry_elapsed),
			..Default::default()
		};

		backoff::future::retry_notify(backoff, operation, notify).await
	}

	async fn get_json<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<Option<T>> {
		match self.get(path).await? {
			Some(response) => Ok(Some(response.json().await?)),
			None => Ok(None),
		}
	}

	async fn get_text(&self, path: &str) -> anyhow::Result<Option<String>> {
		match self.get(path).await? {
			Some(response) => Ok(Some(response.text().await?.trim().to_string())),
			None => Ok(None),
		}
	}

	async fn tx_status(&self, txid: Txid) -> anyhow::Result<TxStatus> {
		self.get_json(&format!("tx/{txid}/status"))
			.await?
			.ok_or_else(|| anyhow!("Transaction {} not found", txid))
	}
}

#[async_trait]
impl BitcoinClient for EsploraClient {
	async fn get_confirmations(&self, txid: Txid) -> anyhow::Result<u32> {
		let status = self.tx_status(txid).await?;

		let block_height = match status {
			TxStatus {
				confirmed: true,
				block_height: Some(block_height),
				..
			} => block_height,
			_ => return Ok(0),
		};

		let tip = self.get_height().await?;

		Ok(tip.saturating_sub(block_height) + 1)
	}

	async fn get_height(&self) -> anyhow::Result<u32> {
		let height = self
			.get_text("blocks/tip/height")
			.await?
			.ok_or_else(|| anyhow!("Could not get the tip height"))?;

		Ok(height.parse()?)
	}

	#[tracing::instrument(skip(self))]
	async fn get_proof(&self, txid: Txid) -> anyhow::Result<Option<ProofData>> {
		let TxStatus {
			confirmed: true,
			block_hash: Some(block_hash),
			..
		} = self.tx_status(txid).await?
		else {
			return Ok(None);
		};

		let Some(merkle_proof) = self
			.get_json::<MerkleProof>(&format!("tx/{txid}/merkle-proof"))
			.await?
		else {
			return Ok(None);
		};

		let header_hex = self
			.get_text(&format!("block/{block_hash}/header"))
			.await?
			.ok_or_else(|| anyhow!("Header of block {} not found", block_hash))?;
		let header: BlockHeader = deserialize(&hex::decode(&header_hex)?)?;

		let merkle_path = merkle_proof
			.merkle
			.iter()
			.map(|hash| TxMerkleNode::from_str(hash))
			.collect::<Result<Vec<_>, _>>()?;

		let proof = ProofData::new(
			txid,
			merkle_proof.block_height,
			&header,
			merkle_path,
			merkle_proof.pos,
		);

		if !proof.is_consistent()? {
			warn!("Merkle proof of {} does not lead to the root of block {}", txid, block_hash);
			return Err(anyhow!("Inconsistent merkle proof for {}", txid));
		}

		trace!("Fetched proof");

		Ok(Some(proof))
	}
}

#[cfg(test)]
mod tests {
	use mockito::Server;

	use super::*;

	// Synthetic block of four transactions, the third being proven
	const TXID: &str = "5e3ff01a8202a85ccf65e64bb026d2bbcb2f1b0da7df16e1bfff63903f80f309";
	const BLOCK_HASH: &str = "d9238e1f0b652bb492799f7a57ca37d97bc2c1238fccaa8183fda6398a5a13f2";
	const HEADER: &str = "000000200000000000000000000000000000000000000000000000000000000000000000e64ec97cfdc3bb758b6b3dccc137b831a8cf31e21216519d8a08f61867d72cff00f15365ffff7f2007000000";
	const MERKLE_PROOF: &str = r#"{"block_height":840000,"merkle":["887f7d34bd766e82d38b1e0794e0d984897d81154551e9ba576499edb3ac1f03","9f3097b3fc39e2392e97d219d6840c3e73714543805d555a1280901a9af455d8"],"pos":2}"#;

	fn txid() -> Txid {
		Txid::from_str(TXID).unwrap()
	}

	fn client(server: &Server) -> EsploraClient {
		EsploraClient::new(&Url::parse(&server.url()).unwrap())
			.with_max_retry_elapsed(Duration::from_millis(10))
	}

	fn confirmed_status() -> String {
		format!(r#"{{"confirmed":true,"block_height":840000,"block_hash":"{BLOCK_HASH}","block_time":1713571767}}"#)
	}

	#[tokio::test]
	async fn should_count_confirmations_from_tip() {
		let mut server = Server::new_async().await;
		let _status = server
			.mock("GET", format!("/tx/{TXID}/status").as_str())
			.with_body(confirmed_status())
			.create_async()
			.await;
		let _tip = server
			.mock("GET", "/blocks/tip/height")
			.with_body("840005")
			.create_async()
			.await;

		assert_eq!(client(&server).get_confirmations(txid()).await.unwrap(), 6);
	}

	#[tokio::test]
	async fn mempool_transactions_have_no_confirmations() {
		let mut server = Server::new_async().await;
		let _status = server
			.mock("GET", format!("/tx/{TXID}/status").as_str())
			.with_body(r#"{"confirmed":false}"#)
			.create_async()
			.await;

		assert_eq!(client(&server).get_confirmations(txid()).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn unknown_transactions_are_errors() {
		let mut server = Server::new_async().await;
		let _status = server
			.mock("GET", format!("/tx/{TXID}/status").as_str())
			.with_status(404)
			.create_async()
			.await;

		assert!(client(&server).get_confirmations(txid()).await.is_err());
	}

	#[tokio::test]
	async fn client_errors_are_not_retried() {
		let mut server = Server::new_async().await;
		let status = server
			.mock("GET", format!("/tx/{TXID}/status").as_str())
			.with_status(400)
			.expect(1)
			.create_async()
			.await;

		assert!(client(&server).get_confirmations(txid()).await.is_err());
		status.assert_async().await;
	}

	#[tokio::test]
	async fn should_build_proof_from_merkle_proof_and_header() {
		let mut server = Server::new_async().await;
		let _status = server
			.mock("GET", format!("/tx/{TXID}/status").as_str())
			.with_body(confirmed_status())
			.create_async()
			.await;
		let _proof = server
			.mock("GET", format!("/tx/{TXID}/merkle-proof").as_str())
			.with_body(MERKLE_PROOF)
			.create_async()
			.await;
		let _header = server
			.mock("GET", format!("/block/{BLOCK_HASH}/header").as_str())
			.with_body(HEADER)
			.create_async()
			.await;

		let proof = client(&server).get_proof(txid()).await.unwrap().unwrap();

		assert_eq!(proof.block_height, 840000);
		assert_eq!(proof.tx_index, 2);
		assert_eq!(proof.block_hash.to_string(), BLOCK_HASH);
		assert_eq!(proof.merkle_path.len(), 2);
	}

	#[tokio::test]
	async fn should_reject_inconsistent_merkle_proof() {
		let mut server = Server::new_async().await;
		let _status = server
			.mock("GET", format!("/tx/{TXID}/status").as_str())
			.with_body(confirmed_status())
			.create_async()
			.await;
		let _proof = server
			.mock("GET", format!("/tx/{TXID}/merkle-proof").as_str())
			.with_body(MERKLE_PROOF.replace(r#""pos":2"#, r#""pos":1"#))
			.create_async()
			.await;
		let _header = server
			.mock("GET", format!("/block/{BLOCK_HASH}/header").as_str())
			.with_body(HEADER)
			.create_async()
			.await;

		assert!(client(&server).get_proof(txid()).await.is_err());
	}

	#[tokio::test]
	async fn unconfirmed_transactions_have_no_proof() {
		let mut server = Server::new_async().await;
		let _status = server
			.mock("GET", format!("/tx/{TXID}/status").as_str())
			.with_body(r#"{"confirmed":false}"#)
			.create_async()
			.await;

		assert_eq!(client(&server).get_proof(txid()).await.unwrap(), None);
	}
}
