use bitcoin::Txid;
use clap::Parser;

use crate::{commands::utils, config::Config};

/// Arguments of `ordbridge proof`
#[derive(Parser, Debug, Clone)]
pub struct ProofArgs {
	/// Transaction to prove
	tx_id: Txid,
}

/// Wait until the transaction is confirmed and print its proof of inclusion
pub async fn proof(config: &Config, args: &ProofArgs) -> anyhow::Result<()> {
	let proof = utils::poller(config).wait_and_prove(args.tx_id).await?;

	utils::print_json(&proof)
}
