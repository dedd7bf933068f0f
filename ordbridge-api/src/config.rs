//! Proxy configuration
use std::{fs::File, net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;

/// Ordinal bridge request proxy
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
	/// Where the config file is located
	#[arg(short, long, value_name = "FILE")]
	pub config_file: PathBuf,
}

/// Proxy configuration. This is deserialized once and never mutated
/// throughout the lifetime of the server.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
	/// Address the HTTP server binds to
	#[serde(default = "default_listen_address")]
	pub listen_address: SocketAddr,

	/// Base URL of the bridge listener service. Kept as given so that a
	/// malformed value surfaces as an invalid URL error per request.
	pub bridge_listener_url: String,

	/// Timeout of a forwarded request, in seconds
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
}

fn default_listen_address() -> SocketAddr {
	SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_request_timeout_secs() -> u64 {
	30
}

impl Config {
	/// Read the config file specified in the CLI args
	pub fn from_args(args: Cli) -> anyhow::Result<Self> {
		Self::from_path(args.config_file)
	}

	/// Read a JSON config file
	pub fn from_path(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
		let path = path.into();
		let config_file = File::open(&path).map_err(|err| {
			anyhow::anyhow!("Could not open config file {}: {}", path.display(), err)
		})?;

		Ok(serde_json::from_reader(config_file)?)
	}

	/// Timeout applied to every forwarded request
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}
