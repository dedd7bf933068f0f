//! Bitcoin client implementations

use std::fmt::Debug;

use async_trait::async_trait;
use bitcoin::Txid;
use ordbridge_core::proof::ProofData;

pub mod esplora;

/// Bitcoin client
#[async_trait]
pub trait BitcoinClient: Send + Sync + Debug {
	/// Number of confirmations of a transaction, 0 while it is in the mempool
	async fn get_confirmations(&self, txid: Txid) -> anyhow::Result<u32>;

	/// Get the current block height
	async fn get_height(&self) -> anyhow::Result<u32>;

	/// Proof of inclusion of a confirmed transaction. `None` when the explorer
	/// has no merkle proof for it.
	async fn get_proof(&self, txid: Txid) -> anyhow::Result<Option<ProofData>>;
}
