//! Library surface for the oracle orchestrator binary.
//!
//! Split out so integration tests can exercise the indexer tick and config
//! loader directly, the way `sr-oracles` separates its command
//! implementations from its CLI entry point.

pub mod config;
pub mod indexer;
