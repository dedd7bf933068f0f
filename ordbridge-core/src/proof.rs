//! Proof payload of a confirmed Bitcoin transaction
use bitcoin::{
	consensus::encode::{deserialize, serialize},
	hashes::{sha256d, Hash},
	BlockHash, BlockHeader, TxMerkleNode, Txid,
};
use serde::{Deserialize, Serialize};

use crate::{BridgeError, BridgeResult};

/// Data showing that a Bitcoin transaction was mined in a given block. It is
/// forwarded to the bridge listener once the transaction is deep enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofData {
	/// The proven transaction
	pub txid: Txid,
	/// Height of the block containing the transaction
	pub block_height: u32,
	/// Hash of the block containing the transaction
	pub block_hash: BlockHash,
	/// Consensus-encoded block header, hex
	pub block_header: String,
	/// Sibling hashes from the leaf up to the root
	pub merkle_path: Vec<TxMerkleNode>,
	/// Position of the transaction in the block
	pub tx_index: u32,
	/// Merkle root committed to by the block header
	pub merkle_root: TxMerkleNode,
}

impl ProofData {
	/// Assemble a proof from the block header and the merkle branch of the
	/// transaction
	pub fn new(
		txid: Txid,
		block_height: u32,
		header: &BlockHeader,
		merkle_path: Vec<TxMerkleNode>,
		tx_index: u32,
	) -> Self {
		Self {
			txid,
			block_height,
			block_hash: header.block_hash(),
			block_header: hex::encode(serialize(header)),
			merkle_path,
			tx_index,
			merkle_root: header.merkle_root,
		}
	}

	/// Proof without inclusion data, for listeners that fetch it themselves
	pub fn placeholder(txid: Txid) -> Self {
		Self {
			txid,
			block_height: 0,
			block_hash: BlockHash::from_inner([0; 32]),
			block_header: String::new(),
			merkle_path: vec![],
			tx_index: 0,
			merkle_root: TxMerkleNode::from_inner([0; 32]),
		}
	}

	/// Whether this proof carries no inclusion data
	pub fn is_placeholder(&self) -> bool {
		self.block_header.is_empty()
	}

	/// Decode the block header
	pub fn header(&self) -> BridgeResult<BlockHeader> {
		let bytes = hex::decode(&self.block_header)?;
		deserialize(&bytes).map_err(|err| BridgeError::MalformedHeader(err.to_string()))
	}

	/// Fold the merkle path from the transaction up to the root. At each
	/// level the low bit of the position tells whether the running hash is
	/// the right (1) or left (0) child.
	pub fn compute_merkle_root(&self) -> TxMerkleNode {
		let mut position = self.tx_index;
		let mut current = self.txid.into_inner();

		for sibling in &self.merkle_path {
			let sibling = sibling.into_inner();

			let mut concat = Vec::with_capacity(64);
			if position & 1 == 1 {
				concat.extend_from_slice(&sibling);
				concat.extend_from_slice(&current);
			} else {
				concat.extend_from_slice(&current);
				concat.extend_from_slice(&sibling);
			}

			current = sha256d::Hash::hash(&concat).into_inner();
			position >>= 1;
		}

		TxMerkleNode::from_inner(current)
	}

	/// Whether the merkle path leads to the root of the carried header
	pub fn is_consistent(&self) -> BridgeResult<bool> {
		let header = self.header()?;

		Ok(header.block_hash() == self.block_hash
			&& header.merkle_root == self.merkle_root
			&& self.compute_merkle_root() == header.merkle_root)
	}
}
