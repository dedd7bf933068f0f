#![forbid(missing_docs)]

//! Client side of the ordinal bridge.
//!
//! Tracks a bridge in a local state file, waits for the Bitcoin transfer of
//! the inscription to be confirmed and forwards its proof to the bridge
//! proxy.

/// Client of the bridge proxy API
pub mod api_client;
/// Bitcoin block explorer clients
pub mod bitcoin_client;
/// Commands of the `ordbridge` binary
pub mod commands;
/// Client configuration
pub mod config;
/// Bridge flow driving the state record
pub mod flow;
/// Confirmation poller
pub mod poller;
