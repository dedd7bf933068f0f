use clap::Parser;
use ordbridge_api::{
	config::{Cli, Config},
	server,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer())
		.with(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let args = Cli::parse();
	let config = Config::from_args(args)?;

	server::serve(config).await
}
