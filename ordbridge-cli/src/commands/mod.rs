/// Bridge an inscription end to end
pub mod bridge;
/// Encode contract calldata
pub mod calldata;
/// HTLC requests
pub mod htlc;
/// Write the config template
pub mod init;
/// Wait for a transaction and print its proof
pub mod proof;
/// Register a bridge request
pub mod request;
/// Inspect or clear the local bridge state
pub mod status;
/// Helpers shared by the commands
pub mod utils;
