use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{commands::utils, config::generate_config};

/// Outcome of `ordbridge init`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutput {
	/// Location of the config file
	pub config_path: PathBuf,
	/// Whether the template was written, `false` when a config existed
	pub created: bool,
}

/// Write the config template to `config_path` and report where it is
pub fn init(config_path: &Path) -> anyhow::Result<()> {
	let created = generate_config(config_path)?;

	utils::print_json(&InitOutput {
		config_path: config_path.to_path_buf(),
		created,
	})
}
