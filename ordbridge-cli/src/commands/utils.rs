use std::io::{stdout, Write};

use ordbridge_core::state::JsonFileStore;
use serde::Serialize;
use serde_json::Value;

use crate::{
	api_client::ApiClient,
	bitcoin_client::esplora::EsploraClient,
	config::Config,
	flow::BridgeClient,
	poller::ConfirmationPoller,
};

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
	let mut out = stdout().lock();

	serde_json::to_writer_pretty(&mut out, value)?;
	writeln!(out)?;

	Ok(())
}

/// Parse a JSON argument
pub fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
	serde_json::from_str(text)
}

/// Poller over the configured esplora endpoint
pub fn poller(config: &Config) -> ConfirmationPoller<EsploraClient> {
	ConfirmationPoller::new(EsploraClient::new(&config.esplora_url), config.poller())
}

/// Bridge client wired to the configured endpoints and state file
pub fn bridge_client(config: &Config) -> BridgeClient<EsploraClient, JsonFileStore> {
	BridgeClient::new(
		poller(config),
		ApiClient::new(config.api_url.clone()),
		JsonFileStore::new(&config.state_file),
	)
}
