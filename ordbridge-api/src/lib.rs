//! # ordbridge-api: bridge request proxy
//!
//! Validates bridge and HTLC requests and forwards them to the external
//! bridge listener service. Transport failures towards the listener are
//! translated into fixed JSON error bodies.
#![forbid(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod server;
