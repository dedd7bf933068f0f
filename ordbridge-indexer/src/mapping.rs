//! Mappings from contract logs to event records
use std::collections::HashMap;

use alloy_primitives::{Address, B256};
use ordbridge_core::{
	events::{mirrored_topics, ContractKind, EventPayload},
	BridgeResult,
};

use crate::source::Log;

/// Decoders of the mirrored contracts, keyed by contract address
#[derive(Debug, Clone, Default)]
pub struct Mapping {
	contracts: HashMap<Address, ContractKind>,
}

impl Mapping {
	/// Mapping of the given contracts
	pub fn new(contracts: impl IntoIterator<Item = (Address, ContractKind)>) -> Self {
		Self {
			contracts: contracts.into_iter().collect(),
		}
	}

	/// Addresses of the mirrored contracts, sorted
	pub fn addresses(&self) -> Vec<Address> {
		let mut addresses: Vec<_> = self.contracts.keys().copied().collect();
		addresses.sort();
		addresses
	}

	/// Signature hashes of the mirrored events, sorted
	pub fn topics(&self) -> Vec<B256> {
		let mut topics: Vec<_> = self
			.contracts
			.values()
			.flat_map(|kind| mirrored_topics(*kind))
			.collect();
		topics.sort();
		topics.dedup();
		topics
	}

	/// Kind of the contract at `address`, if mirrored
	pub fn kind(&self, address: &Address) -> Option<ContractKind> {
		self.contracts.get(address).copied()
	}

	/// Decode a log. Returns `None` when the emitter is not mirrored or the
	/// topic is not one of its mirrored events.
	pub fn decode(&self, log: &Log) -> Option<BridgeResult<(ContractKind, EventPayload)>> {
		let kind = self.kind(&log.address)?;

		let payload = EventPayload::decode(kind, &log.topics, &log.data)?;

		Some(payload.map(|payload| (kind, payload)))
	}
}

#[cfg(test)]
mod tests {
	use alloy_primitives::{Bytes, B256, U256};
	use alloy_sol_types::SolEvent;
	use ordbridge_core::contracts::{Bridge, Marketplace};

	use super::*;

	const BRIDGE: Address = Address::new([0xb1; 20]);
	const MARKETPLACE: Address = Address::new([0xa1; 20]);

	fn log<E: SolEvent>(address: Address, event: &E) -> Log {
		Log {
			address,
			topics: event.encode_topics().into_iter().map(|t| t.0).collect(),
			data: Bytes::from(event.encode_data()),
			block_number: Some(1),
			transaction_hash: Some(B256::repeat_byte(1)),
			log_index: Some(0),
			removed: false,
		}
	}

	fn mapping() -> Mapping {
		Mapping::new([
			(BRIDGE, ContractKind::Bridge),
			(MARKETPLACE, ContractKind::Marketplace),
		])
	}

	#[test]
	fn should_decode_by_emitter() {
		let cancelled = Marketplace::OrderCancelled {
			orderId: U256::from(9),
		};

		let decoded = mapping().decode(&log(MARKETPLACE, &cancelled)).unwrap().unwrap();

		assert_eq!(
			decoded,
			(
				ContractKind::Marketplace,
				EventPayload::OrderCancelled {
					order_id: U256::from(9)
				}
			)
		);
	}

	#[test]
	fn should_skip_unknown_emitters_and_topics() {
		let bridged = Bridge::OrdinalBridged {
			inscriptionId: "x".into(),
			tokenId: U256::from(1),
			receiver: Address::ZERO,
		};

		assert!(mapping().decode(&log(Address::ZERO, &bridged)).is_none());
		// a bridge event emitted by the marketplace is not one of its events
		assert!(mapping().decode(&log(MARKETPLACE, &bridged)).is_none());
	}

	#[test]
	fn addresses_are_sorted() {
		assert_eq!(mapping().addresses(), vec![MARKETPLACE, BRIDGE]);
	}

	#[test]
	fn topics_cover_the_events_of_mirrored_contracts() {
		let marketplace_only = Mapping::new([(MARKETPLACE, ContractKind::Marketplace)]);

		assert_eq!(mapping().topics().len(), 5);
		assert_eq!(marketplace_only.topics().len(), 4);
		assert!(!marketplace_only
			.topics()
			.contains(&Bridge::OrdinalBridged::SIGNATURE_HASH));
		assert!(Mapping::default().topics().is_empty());
	}
}
