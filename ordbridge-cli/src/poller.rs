//! Confirmation poller
//!
//! Polls the block explorer on a fixed interval until a transaction is
//! buried deep enough. Failed checks are logged and retried on the next
//! tick, the loop never gives up on its own.
use std::time::Duration;

use bitcoin::Txid;
use ordbridge_core::proof::ProofData;
use tracing::{debug, info, warn};

use crate::bitcoin_client::BitcoinClient;

/// Poller settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
	/// Time between two checks
	pub interval: Duration,
	/// Confirmations to wait for
	pub required_confirmations: u32,
}

impl Default for PollerConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(60),
			required_confirmations: 6,
		}
	}
}

/// Waits for Bitcoin transactions to be confirmed
#[derive(Debug)]
pub struct ConfirmationPoller<C> {
	client: C,
	config: PollerConfig,
}

impl<C: BitcoinClient> ConfirmationPoller<C> {
	/// Create a poller querying `client`
	pub fn new(client: C, config: PollerConfig) -> Self {
		Self { client, config }
	}

	/// The underlying Bitcoin client
	pub fn client(&self) -> &C {
		&self.client
	}

	/// Poller settings
	pub fn config(&self) -> PollerConfig {
		self.config
	}

	/// Wait until `txid` has at least the required confirmations and return
	/// the observed count
	pub async fn wait_for_confirmations(&self, txid: Txid) -> u32 {
		self.wait_with_progress(txid, |_| {}).await
	}

	/// Same as [`Self::wait_for_confirmations`], reporting every observed
	/// confirmation count to `on_progress`
	#[tracing::instrument(skip(self, on_progress))]
	pub async fn wait_with_progress<F>(&self, txid: Txid, mut on_progress: F) -> u32
	where
		F: FnMut(u32),
	{
		let required = self.config.required_confirmations;

		loop {
			match self.client.get_confirmations(txid).await {
				Ok(confirmations) => {
					on_progress(confirmations);

					if confirmations >= required {
						info!("Transaction confirmed with {} confirmations", confirmations);
						return confirmations;
					}

					debug!("{}/{} confirmations", confirmations, required);
				}
				Err(err) => warn!("Could not check confirmations: {:?}", err),
			}

			tokio::time::sleep(self.config.interval).await;
		}
	}

	/// Wait for the confirmations, then fetch the proof of inclusion. When the
	/// explorer has no merkle proof a placeholder proof is returned.
	pub async fn wait_and_prove(&self, txid: Txid) -> anyhow::Result<ProofData> {
		self.wait_for_confirmations(txid).await;
		self.prove(txid).await
	}

	/// Fetch the proof of inclusion of a confirmed transaction
	pub async fn prove(&self, txid: Txid) -> anyhow::Result<ProofData> {
		match self.client.get_proof(txid).await? {
			Some(proof) => Ok(proof),
			None => {
				warn!("No merkle proof available for {}, using a placeholder", txid);
				Ok(ProofData::placeholder(txid))
			}
		}
	}
}
