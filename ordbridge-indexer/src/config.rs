//! Indexer configuration
use std::{fs::File, path::PathBuf, time::Duration};

use alloy_primitives::Address;
use anyhow::{anyhow, Context};
use clap::Parser;
use ordbridge_core::events::ContractKind;
use url::Url;

/// Ordinal bridge event indexer
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
	/// Where the config file is located
	#[arg(short, long, value_name = "FILE")]
	pub config_file: PathBuf,
}

/// Indexer configuration. This is deserialized once and never mutated
/// throughout the lifetime of the indexer.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
	/// Directory to persist the event store to
	pub state_directory: PathBuf,

	/// JSON-RPC endpoint of the EVM node
	pub rpc_url: Url,

	/// Address of the bridge contract
	#[serde(default)]
	pub bridge_address: Option<Address>,

	/// Address of the marketplace contract
	#[serde(default)]
	pub marketplace_address: Option<Address>,

	/// First block to index when no checkpoint exists
	#[serde(default)]
	pub start_block: u64,

	/// Blocks queried per `eth_getLogs` call
	#[serde(default = "default_batch_size")]
	pub batch_size: u64,

	/// Seconds to wait once the indexer caught up with the chain head
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
}

fn default_batch_size() -> u64 {
	1000
}

fn default_poll_interval_secs() -> u64 {
	12
}

impl Config {
	/// Read the config file specified in the CLI args
	pub fn from_args(args: Cli) -> anyhow::Result<Self> {
		Self::from_path(args.config_file)
	}

	/// Read a JSON config file. A relative state directory is resolved
	/// against the directory of the config file.
	pub fn from_path(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
		let path = path.into();
		let config_file = File::open(&path)
			.with_context(|| format!("Could not open config file {}", path.display()))?;
		let mut config: Self = serde_json::from_reader(config_file)?;

		if config.state_directory.is_relative() {
			if let Some(parent) = path.parent() {
				config.state_directory = parent.join(&config.state_directory);
			}
		}

		if config.batch_size == 0 {
			return Err(anyhow!("batch_size must be at least 1"));
		}

		Ok(config)
	}

	/// Mirrored contracts and their kind
	pub fn contracts(&self) -> Vec<(Address, ContractKind)> {
		[
			(self.bridge_address, ContractKind::Bridge),
			(self.marketplace_address, ContractKind::Marketplace),
		]
		.into_iter()
		.filter_map(|(address, kind)| Some((address?, kind)))
		.collect()
	}

	/// Time to wait once caught up
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}

	/// File holding the event store
	pub fn event_log_path(&self) -> PathBuf {
		self.state_directory.join("events.ndjson")
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn should_resolve_state_directory_next_to_config() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("indexer.json");
		let mut file = File::create(&path).unwrap();
		write!(
			file,
			r#"{{
				"state_directory": "state",
				"rpc_url": "http://localhost:8545",
				"bridge_address": "0x5FbDB2315678afecb367f032d93F642f64180aa3"
			}}"#
		)
		.unwrap();

		let config = Config::from_path(&path).unwrap();

		assert_eq!(config.state_directory, dir.path().join("state"));
		assert_eq!(config.event_log_path(), dir.path().join("state/events.ndjson"));
		assert_eq!(config.batch_size, 1000);
		assert_eq!(config.poll_interval(), Duration::from_secs(12));
		assert_eq!(
			config.contracts(),
			vec![(
				"0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap(),
				ContractKind::Bridge
			)]
		);
	}

	#[test]
	fn should_reject_empty_batches() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("indexer.json");
		std::fs::write(
			&path,
			r#"{"state_directory": "/tmp/state", "rpc_url": "http://localhost:8545", "batch_size": 0}"#,
		)
		.unwrap();

		assert!(Config::from_path(&path).is_err());
	}
}
