//! Oracle orchestrator port traits
//!
//! These are the interfaces the indexer loop and request processor program
//! against; `oracle-adapters` provides the concrete implementations. Traits
//! are `async_trait`-based so the orchestrator can hold them as trait
//! objects (`Vec<Box<dyn ChainAdapter>>`) — one boxed adapter per
//! configured chain family.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oracle_domain::{NewEventRow, RequestEvent};
use thiserror::Error;

/// Durable log of processed events, keyed by `(chain, oracle, event-seq)`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// The highest `eventSeq` already recorded for `(chain, oracle)`, or
    /// `None` if nothing has been recorded yet.
    async fn latest_cursor(
        &self,
        chain: &str,
        oracle: &str,
    ) -> Result<Option<u64>, EventStoreError>;

    /// Insert a row for an attempted event. On a duplicate idempotence key
    /// this is a no-op, not an error.
    async fn record_attempt(&self, row: NewEventRow) -> Result<(), EventStoreError>;
}

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

/// One adapter per supported chain family. Implementors decode that
/// chain's wire format for events and for the `notify` callback descriptor,
/// and own construction/signing/submission of the `fulfil_request` call.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// e.g. `"ROOCH-testnet"`, `"APTOS-MAINNET"`.
    fn chain_id(&self) -> &str;

    /// The orchestrator's own address on this chain, derived from its key.
    fn oracle_address(&self) -> &str;

    /// At most `batch_size` events strictly newer than `since_cursor`,
    /// ascending by `eventSeq`, filtered to `RequestAdded` events of this
    /// adapter's oracle module.
    async fn fetch_events(
        &self,
        since_cursor: Option<u64>,
        batch_size: usize,
    ) -> Result<Vec<RequestEvent>, ChainError>;

    /// Whether the on-chain response status for this request is already
    /// set to a non-zero value.
    async fn is_already_fulfilled(&self, request_id: &str) -> Result<bool, ChainError>;

    /// Construct, sign, submit, and wait for confirmation of
    /// `fulfil_request(request_id, status, message)`. Pre-checks
    /// `is_already_fulfilled` and returns a skipped receipt without
    /// submitting when already set.
    async fn submit(
        &self,
        request_id: &str,
        status: u16,
        message: &str,
    ) -> Result<SubmitReceipt, ChainError>;
}

/// Result of a fulfilment submission attempt.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub tx_hash: Option<String>,
    pub skipped: bool,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC error: {message}")]
    Rpc { message: String },

    #[error("transaction submission failed: {message}")]
    SubmissionFailed { message: String },

    #[error("signing error: {message}")]
    Signing { message: String },

    #[error("decode error: {message}")]
    Decode { message: String },
}

/// Optional remote proof verifier.
#[async_trait]
pub trait ProofVerifier: Send + Sync {
    async fn verify(
        &self,
        proof_bytes: &[u8],
        notary_pub_key: &str,
    ) -> Result<ProofAttestation, ProofError>;
}

#[derive(Debug, Clone)]
pub struct ProofAttestation {
    pub signature: String,
    pub root: String,
    pub results: Vec<ProofResult>,
}

impl ProofAttestation {
    /// The orchestrator uses the first `FullProof` result as
    /// `proof_generated`.
    pub fn first_full_proof(&self) -> Option<&str> {
        self.results.iter().find_map(|r| match r {
            ProofResult::FullProof(s) => Some(s.as_str()),
            ProofResult::SessionProof(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum ProofResult {
    SessionProof(String),
    FullProof(String),
}

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("verifier unavailable: {message}")]
    Unavailable { message: String },

    #[error("verification rejected: {message}")]
    Rejected { message: String },
}

/// Clock port for deterministic time handling in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
