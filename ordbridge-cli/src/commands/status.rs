use serde_json::json;

use crate::{commands::utils, config::Config};

/// Print the state of the current bridge, `null` when there is none or it
/// has expired
pub fn status(config: &Config) -> anyhow::Result<()> {
	let state = utils::bridge_client(config).status()?;

	utils::print_json(&state)
}

/// Forget the current bridge
pub fn clear(config: &Config) -> anyhow::Result<()> {
	utils::bridge_client(config).clear()?;

	utils::print_json(&json!({ "cleared": true }))
}
