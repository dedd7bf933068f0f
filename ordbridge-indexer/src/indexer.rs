//! Indexing loop
use std::time::Duration;

use ordbridge_core::{events::EventRecord, BridgeError};
use tracing::{debug, info, trace, warn};

use crate::{mapping::Mapping, source::LogSource, store::EventStore};

/// Indexing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerConfig {
	/// First block to index when the store has no checkpoint
	pub start_block: u64,
	/// Blocks queried at once
	pub batch_size: u64,
	/// Time to wait once caught up with the chain head
	pub poll_interval: Duration,
}

impl Default for IndexerConfig {
	fn default() -> Self {
		Self {
			start_block: 0,
			batch_size: 1000,
			poll_interval: Duration::from_secs(12),
		}
	}
}

/// Mirrors the logs of a source into an event store
#[derive(Debug)]
pub struct Indexer<L> {
	source: L,
	mapping: Mapping,
	store: EventStore,
	config: IndexerConfig,
}

impl<L: LogSource> Indexer<L> {
	/// Create an indexer
	pub fn new(source: L, mapping: Mapping, store: EventStore, config: IndexerConfig) -> Self {
		Self {
			source,
			mapping,
			store,
			config,
		}
	}

	/// The event store
	pub fn store(&self) -> &EventStore {
		&self.store
	}

	/// Index forever, sleeping between rounds. Failed rounds are retried on
	/// the next tick from the last checkpoint.
	#[tracing::instrument(skip(self))]
	pub async fn run(&mut self) -> anyhow::Result<()> {
		info!("Indexing {} contracts", self.mapping.addresses().len());

		loop {
			match self.index_once().await {
				Ok(0) => trace!("No new records"),
				Ok(inserted) => info!("Indexed {} new records", inserted),
				Err(err) => warn!("Indexing round failed: {:?}", err),
			}

			tokio::time::sleep(self.config.poll_interval).await;
		}
	}

	/// Index from the block after the checkpoint up to the chain head, one
	/// batch at a time. Returns the number of inserted records.
	pub async fn index_once(&mut self) -> anyhow::Result<usize> {
		let latest = self.source.latest_block().await?;
		let mut from = self
			.store
			.checkpoint()
			.map_or(self.config.start_block, |block| block + 1);
		let mut inserted = 0;

		while from <= latest {
			let to = latest.min(from.saturating_add(self.config.batch_size.max(1) - 1));
			inserted += self.index_range(from, to).await?;
			from = to + 1;
		}

		Ok(inserted)
	}

	/// Index the inclusive block range and checkpoint its last block.
	/// Returns the number of inserted records.
	///
	/// Removed logs, logs without a position and logs whose fields do not
	/// decode against the contract ABI are skipped with a log line. The
	/// checkpoint still moves past them and they are never retried. Source
	/// and store failures abort the range without moving the checkpoint.
	pub async fn index_range(&mut self, from: u64, to: u64) -> anyhow::Result<usize> {
		let addresses = self.mapping.addresses();
		let topics = self.mapping.topics();
		let logs = self.source.logs(from, to, &addresses, &topics).await?;
		debug!("Blocks {}..={} hold {} logs", from, to, logs.len());

		let mut inserted = 0;

		for log in logs {
			if log.removed {
				trace!("Skipping removed log of {:?}", log.transaction_hash);
				continue;
			}

			let (contract, payload) = match self.mapping.decode(&log) {
				None => {
					trace!("Skipping unmapped log of {} with topics {:?}", log.address, log.topics);
					continue;
				}
				Some(Err(err)) => {
					warn!("Could not decode log of {:?}: {}", log.transaction_hash, err);
					continue;
				}
				Some(Ok(decoded)) => decoded,
			};

			let (Some(block_number), Some(transaction_hash), Some(log_index)) =
				(log.block_number, log.transaction_hash, log.log_index)
			else {
				warn!("{}", BridgeError::IncompleteLog("position"));
				continue;
			};

			let block_timestamp = self.source.block_timestamp(block_number).await?;

			let record = EventRecord::new(
				block_number,
				block_timestamp,
				transaction_hash,
				log_index,
				log.address,
				contract,
				payload,
			);

			if self.store.insert(record).await? {
				inserted += 1;
			}
		}

		self.store.set_checkpoint(to).await?;

		Ok(inserted)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use alloy_primitives::{Address, Bytes, B256, U256};
	use alloy_sol_types::SolEvent;
	use async_trait::async_trait;
	use ordbridge_core::{
		contracts::{Bridge, Marketplace},
		events::{ContractKind, EventPayload},
	};

	use super::*;
	use crate::source::Log;

	const BRIDGE: Address = Address::new([0xb1; 20]);
	const MARKETPLACE: Address = Address::new([0xa1; 20]);

	#[derive(Debug, Default)]
	struct FakeChain {
		head: u64,
		logs: Vec<Log>,
		queries: Mutex<Vec<(u64, u64)>>,
	}

	#[async_trait]
	impl LogSource for FakeChain {
		async fn latest_block(&self) -> anyhow::Result<u64> {
			Ok(self.head)
		}

		async fn logs(
			&self,
			from: u64,
			to: u64,
			addresses: &[Address],
			topics: &[B256],
		) -> anyhow::Result<Vec<Log>> {
			self.queries.lock().unwrap().push((from, to));

			Ok(self
				.logs
				.iter()
				.filter(|log| {
					let block = log.block_number.unwrap_or_default();
					block >= from
						&& block <= to
						&& addresses.contains(&log.address)
						&& log.topics.first().is_some_and(|topic| topics.contains(topic))
				})
				.cloned()
				.collect())
		}

		async fn block_timestamp(&self, number: u64) -> anyhow::Result<u64> {
			Ok(1_700_000_000 + number * 12)
		}
	}

	fn log<E: SolEvent>(address: Address, block: u64, log_index: u64, event: &E) -> Log {
		Log {
			address,
			topics: event.encode_topics().into_iter().map(|t| t.0).collect(),
			data: Bytes::from(event.encode_data()),
			block_number: Some(block),
			transaction_hash: Some(B256::with_last_byte(block as u8)),
			log_index: Some(log_index),
			removed: false,
		}
	}

	fn cancelled(order_id: u64) -> Marketplace::OrderCancelled {
		Marketplace::OrderCancelled {
			orderId: U256::from(order_id),
		}
	}

	fn indexer(chain: FakeChain, batch_size: u64) -> Indexer<FakeChain> {
		Indexer::new(
			chain,
			Mapping::new([
				(BRIDGE, ContractKind::Bridge),
				(MARKETPLACE, ContractKind::Marketplace),
			]),
			EventStore::in_memory(),
			IndexerConfig {
				batch_size,
				..Default::default()
			},
		)
	}

	#[tokio::test]
	async fn should_index_in_batches_up_to_the_head() {
		let chain = FakeChain {
			head: 25,
			logs: vec![
				log(MARKETPLACE, 3, 0, &cancelled(1)),
				log(
					BRIDGE,
					12,
					4,
					&Bridge::OrdinalBridged {
						inscriptionId: "abc".into(),
						tokenId: U256::from(7),
						receiver: Address::repeat_byte(0x77),
					},
				),
				log(MARKETPLACE, 25, 1, &cancelled(2)),
			],
			..Default::default()
		};
		let mut indexer = indexer(chain, 10);

		assert_eq!(indexer.index_once().await.unwrap(), 3);

		assert_eq!(
			*indexer.source.queries.lock().unwrap(),
			vec![(0, 9), (10, 19), (20, 25)]
		);
		assert_eq!(indexer.store().checkpoint(), Some(25));

		let bridged = indexer.store().by_event("OrdinalBridged").next().unwrap();
		assert_eq!(bridged.block_number, 12);
		assert_eq!(bridged.block_timestamp, 1_700_000_144);
		assert_eq!(bridged.log_index, 4);
		assert_eq!(bridged.contract, ContractKind::Bridge);
		assert!(matches!(
			bridged.payload,
			EventPayload::OrdinalBridged { token_id, .. } if token_id == U256::from(7)
		));
	}

	#[tokio::test]
	async fn should_resume_after_the_checkpoint() {
		let chain = FakeChain {
			head: 5,
			logs: vec![log(MARKETPLACE, 5, 0, &cancelled(1))],
			..Default::default()
		};
		let mut indexer = indexer(chain, 100);

		assert_eq!(indexer.index_once().await.unwrap(), 1);

		indexer.source.head = 8;
		indexer.source.logs.push(log(MARKETPLACE, 7, 0, &cancelled(2)));

		assert_eq!(indexer.index_once().await.unwrap(), 1);
		assert_eq!(indexer.index_once().await.unwrap(), 0);
		assert_eq!(*indexer.source.queries.lock().unwrap(), vec![(0, 5), (6, 8)]);
		assert_eq!(indexer.store().len(), 2);
	}

	#[tokio::test]
	async fn should_skip_removed_unmapped_and_duplicate_logs() {
		let mut removed = log(MARKETPLACE, 2, 1, &cancelled(2));
		removed.removed = true;

		// marketplace event emitted by the bridge is not mapped
		let unmapped = log(BRIDGE, 2, 2, &cancelled(3));

		let chain = FakeChain {
			head: 2,
			logs: vec![log(MARKETPLACE, 2, 0, &cancelled(1)), removed, unmapped],
			..Default::default()
		};
		let mut indexer = indexer(chain, 100);

		assert_eq!(indexer.index_range(0, 2).await.unwrap(), 1);
		assert_eq!(indexer.index_range(0, 2).await.unwrap(), 0);
		assert_eq!(indexer.store().len(), 1);
	}

	#[tokio::test]
	async fn undecodable_logs_are_skipped_past_the_checkpoint() {
		let mut truncated = log(
			MARKETPLACE,
			4,
			0,
			&Marketplace::OrderFilled {
				orderId: U256::from(1),
				buyer: Address::repeat_byte(0x33),
				price: U256::from(5),
			},
		);
		truncated.data = Bytes::new();

		let chain = FakeChain {
			head: 4,
			logs: vec![truncated, log(MARKETPLACE, 4, 1, &cancelled(2))],
			..Default::default()
		};
		let mut indexer = indexer(chain, 100);

		assert_eq!(indexer.index_once().await.unwrap(), 1);
		assert_eq!(indexer.store().checkpoint(), Some(4));
		assert_eq!(indexer.store().records()[0].log_index, 1);
	}

	#[tokio::test]
	async fn unmirrored_topics_are_filtered_at_the_source() {
		let mut foreign = log(MARKETPLACE, 1, 0, &cancelled(1));
		foreign.topics[0] = B256::repeat_byte(0xee);

		let chain = FakeChain {
			head: 1,
			logs: vec![foreign],
			..Default::default()
		};
		let mut indexer = indexer(chain, 100);

		assert_eq!(indexer.index_once().await.unwrap(), 0);
		assert!(indexer.store().is_empty());
	}

	#[tokio::test]
	async fn should_skip_logs_without_position() {
		let mut pending = log(MARKETPLACE, 1, 0, &cancelled(1));
		pending.log_index = None;

		let chain = FakeChain {
			head: 1,
			logs: vec![pending],
			..Default::default()
		};
		let mut indexer = indexer(chain, 100);

		assert_eq!(indexer.index_once().await.unwrap(), 0);
		assert_eq!(indexer.store().checkpoint(), Some(1));
	}
}
