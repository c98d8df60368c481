//! The persisted event row — written once, after an attempt, never mutated.
//! Its presence marks the event as handled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal outcome of an attempt to deliver a fulfilment transaction for an
/// event. This is distinct from the `{status, message}` the orchestrator
/// reports *on chain* — it only tracks whether the `fulfil_request`
/// submission itself succeeded, not whether the upstream call it describes
/// did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventRowStatus {
    Success,
    Failed,
}

/// A row in the `Events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEventRow {
    pub id: i64,
    pub chain: String,
    pub oracle_address: String,
    pub event_handle_id: String,
    pub event_seq: u64,
    pub event_index: u64,
    pub event_type: String,
    pub event_data: String,
    pub decoded_event_data: String,
    pub status: EventRowStatus,
    pub retries: u32,
    pub response: String,
    pub indexed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a new row; `id`/`indexed_at`/`updated_at` are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewEventRow {
    pub chain: String,
    pub oracle_address: String,
    pub event_handle_id: String,
    pub event_seq: u64,
    pub event_index: u64,
    pub event_type: String,
    pub event_data: String,
    pub decoded_event_data: String,
    pub status: EventRowStatus,
    pub response: String,
}

impl NewEventRow {
    /// The `(chain, oracleAddress, eventHandleId, eventSeq)` idempotence key.
    /// Two rows with the same key must never both be persisted.
    pub fn idempotence_key(&self) -> (String, String, String, u64) {
        (
            self.chain.clone(),
            self.oracle_address.clone(),
            self.event_handle_id.clone(),
            self.event_seq,
        )
    }
}
