use std::{
	fs::{create_dir_all, read_to_string, OpenOptions},
	io::Write,
	path::{Path, PathBuf},
	time::Duration,
};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::poller::PollerConfig;

/// Template written by `ordbridge init`
pub const GENERATED_CONFIG: &str = include_str!("../generated_config.toml");

/// Default location of the config file, `~/.config/ordbridge/config.toml`
pub fn default_config_path() -> anyhow::Result<PathBuf> {
	let home_path = dirs::home_dir().ok_or_else(|| anyhow!("Could not locate the home directory"))?;

	Ok(home_path.join(".config/ordbridge/config.toml"))
}

/// Write the config template unless a config already exists. Returns
/// whether the file was created.
pub fn generate_config(config_path: &Path) -> anyhow::Result<bool> {
	if let Some(parent) = config_path.parent() {
		create_dir_all(parent)?;
	}

	if config_path.exists() {
		info!("Config file already exists at {}", config_path.display());
		return Ok(false);
	}

	let mut config_file = OpenOptions::new()
		.create_new(true)
		.write(true)
		.open(config_path)?;

	config_file.write_all(GENERATED_CONFIG.as_bytes())?;
	config_file.flush()?;

	info!(
		"Config file created at {}, make sure to update it before using",
		config_path.display()
	);

	Ok(true)
}

/// Read the config file. A relative state file is resolved against the
/// directory of the config file.
pub fn read_config(config_path: &Path) -> anyhow::Result<Config> {
	let config_file = read_to_string(config_path).with_context(|| {
		format!(
			"Could not read config {}, did you try `ordbridge init`?",
			config_path.display()
		)
	})?;

	let mut config: Config = toml::from_str(&config_file)?;

	if config.state_file.is_relative() {
		if let Some(parent) = config_path.parent() {
			config.state_file = parent.join(&config.state_file);
		}
	}

	Ok(config)
}

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Base URL of the bridge proxy
	pub api_url: Url,
	/// Esplora REST endpoint
	pub esplora_url: Url,
	/// File holding the bridge state
	#[serde(default = "default_state_file")]
	pub state_file: PathBuf,
	/// Seconds between two confirmation checks
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
	/// Confirmations required before the proof is forwarded
	#[serde(default = "default_required_confirmations")]
	pub required_confirmations: u32,
}

fn default_state_file() -> PathBuf {
	PathBuf::from("state.json")
}

fn default_poll_interval_secs() -> u64 {
	PollerConfig::default().interval.as_secs()
}

fn default_required_confirmations() -> u32 {
	PollerConfig::default().required_confirmations
}

impl Config {
	/// Poller settings
	pub fn poller(&self) -> PollerConfig {
		PollerConfig {
			interval: Duration::from_secs(self.poll_interval_secs),
			required_confirmations: self.required_confirmations,
		}
	}
}
