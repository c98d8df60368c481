//! Oracle orchestrator adapter implementations
//!
//! Concrete implementations of the ports in `oracle-ports`:
//! - PostgreSQL and in-memory event stores
//! - The integration registry and its baseline handlers
//! - The request processor
//! - Three chain adapter variants, one per cursor model
//! - An HTTP-based proof verifier

pub mod chains;
pub mod handlers;
pub mod memory;
pub mod postgres;
pub mod processor;
pub mod proof;
pub mod registry;

pub use chains::{HandleModelAdapter, ObjectEventModelAdapter, TxStreamModelAdapter};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use processor::RequestProcessor;
pub use proof::HttpProofVerifier;
pub use registry::IntegrationRegistry;
