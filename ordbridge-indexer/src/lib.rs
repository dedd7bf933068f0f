//! # ordbridge indexer
//!
//! Follows an EVM chain over JSON-RPC and mirrors the logs of the bridge and
//! marketplace contracts into flat, append-only event records. Records and
//! the last indexed block are persisted as newline-delimited JSON and
//! replayed on start, so the indexer resumes where it stopped.
#![forbid(missing_docs)]

pub mod config;
pub mod indexer;
pub mod mapping;
pub mod source;
pub mod store;
