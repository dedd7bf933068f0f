//! Append-only event store
//!
//! Records are kept in insertion order and are never updated or deleted.
//! The persistent store appends every record and every checkpoint as one
//! JSON line and rebuilds itself by replaying the file.
use std::{collections::HashSet, path::Path};

use alloy_primitives::Address;
use anyhow::Context;
use ordbridge_core::events::{ContractKind, EventRecord};
use serde::{Deserialize, Serialize};
use tokio::{
	fs::{create_dir_all, File, OpenOptions},
	io::{AsyncReadExt, AsyncWriteExt, BufWriter},
};
use tracing::{debug, info, warn};

/// A line of the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
enum StoreEntry {
	Record(EventRecord),
	Checkpoint { block: u64 },
}

/// Event records keyed by id
#[derive(Debug, Default)]
pub struct EventStore {
	records: Vec<EventRecord>,
	ids: HashSet<String>,
	checkpoint: Option<u64>,
	log: Option<BufWriter<File>>,
}

impl EventStore {
	/// Store that lives in memory only
	pub fn in_memory() -> Self {
		Self::default()
	}

	/// Open the event log at `path`, replaying its entries. An unterminated
	/// last line left by an interrupted append is dropped from the file.
	pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
		let path = path.as_ref();

		if let Some(parent) = path.parent() {
			create_dir_all(parent).await?;
		}

		let mut file = OpenOptions::new()
			.create(true)
			.read(true)
			.append(true)
			.open(path)
			.await
			.with_context(|| format!("Could not open event log {}", path.display()))?;

		let mut contents = Vec::new();
		file.read_to_end(&mut contents).await?;

		let mut store = Self::default();
		let mut offset = 0;

		for (index, line) in contents.split_inclusive(|byte| *byte == b'\n').enumerate() {
			let terminated = line.ends_with(b"\n");
			let body = line.strip_suffix(b"\n").unwrap_or(line);

			if body.iter().all(u8::is_ascii_whitespace) {
				offset += line.len();
				continue;
			}

			let entry = match serde_json::from_slice::<StoreEntry>(body) {
				Ok(entry) => entry,
				Err(err) if !terminated => {
					warn!(
						"Dropping unterminated entry on line {} of {}: {}",
						index + 1,
						path.display(),
						err
					);
					file.set_len(offset as u64).await?;
					break;
				}
				Err(err) => {
					return Err(anyhow::Error::from(err).context(format!(
						"Malformed entry on line {} of {}",
						index + 1,
						path.display()
					)));
				}
			};

			if !terminated {
				file.write_all(b"\n").await?;
			}
			offset += line.len();

			match entry {
				StoreEntry::Record(record) => {
					store.remember(record);
				}
				StoreEntry::Checkpoint { block } => store.checkpoint = Some(block),
			}
		}

		info!(
			"Replayed {} records, checkpoint {:?}",
			store.records.len(),
			store.checkpoint
		);

		store.log = Some(BufWriter::new(file));

		Ok(store)
	}

	/// Append a record. Returns `false` without storing anything when a
	/// record with the same id exists.
	pub async fn insert(&mut self, record: EventRecord) -> anyhow::Result<bool> {
		if self.ids.contains(&record.id) {
			debug!("Skipping duplicate record {}", record.id);
			return Ok(false);
		}

		let entry = StoreEntry::Record(record);
		self.append(&entry).await?;

		if let StoreEntry::Record(record) = entry {
			self.remember(record);
		}

		Ok(true)
	}

	/// Last block whose logs are all stored
	pub fn checkpoint(&self) -> Option<u64> {
		self.checkpoint
	}

	/// Record that every log up to `block` is stored
	pub async fn set_checkpoint(&mut self, block: u64) -> anyhow::Result<()> {
		self.append(&StoreEntry::Checkpoint { block }).await?;
		self.checkpoint = Some(block);

		Ok(())
	}

	/// All records, in insertion order
	pub fn records(&self) -> &[EventRecord] {
		&self.records
	}

	/// Number of records
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Whether the store holds no record
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Record with the given id
	pub fn get(&self, id: &str) -> Option<&EventRecord> {
		self.records.iter().find(|record| record.id == id)
	}

	/// Records of the named event
	pub fn by_event<'a>(&'a self, event_name: &'a str) -> impl Iterator<Item = &'a EventRecord> {
		self.records
			.iter()
			.filter(move |record| record.event_name == event_name)
	}

	/// Records emitted by a kind of contract
	pub fn by_contract(&self, contract: ContractKind) -> impl Iterator<Item = &EventRecord> {
		self.records
			.iter()
			.filter(move |record| record.contract == contract)
	}

	/// Records emitted by the contract at `address`
	pub fn by_address(&self, address: Address) -> impl Iterator<Item = &EventRecord> {
		self.records
			.iter()
			.filter(move |record| record.contract_address == address)
	}

	fn remember(&mut self, record: EventRecord) -> bool {
		if !self.ids.insert(record.id.clone()) {
			return false;
		}

		self.records.push(record);
		true
	}

	async fn append(&mut self, entry: &StoreEntry) -> anyhow::Result<()> {
		let Some(log) = self.log.as_mut() else {
			return Ok(());
		};

		let mut line = serde_json::to_vec(entry)?;
		line.push(b'\n');
		log.write_all(&line).await?;
		log.flush().await?;

		Ok(())
	}
}
