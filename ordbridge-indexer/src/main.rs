use clap::Parser;
use ordbridge_indexer::{
	config::{Cli, Config},
	indexer::{Indexer, IndexerConfig},
	mapping::Mapping,
	source::JsonRpcLogSource,
	store::EventStore,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer())
		.with(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let args = Cli::parse();
	let config = Config::from_args(args)?;

	let contracts = config.contracts();
	if contracts.is_empty() {
		anyhow::bail!("No contract address configured, nothing to index");
	}

	info!("Starting replay of persisted events");
	let store = EventStore::open(config.event_log_path()).await?;
	info!("Replay finished with {} records", store.len());

	let mut indexer = Indexer::new(
		JsonRpcLogSource::new(config.rpc_url.clone()),
		Mapping::new(contracts),
		store,
		IndexerConfig {
			start_block: config.start_block,
			batch_size: config.batch_size,
			poll_interval: config.poll_interval(),
		},
	);

	indexer.run().await
}
