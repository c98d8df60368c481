//! In-memory event store, used in tests and as a local dev fallback when no
//! `DATABASE_URL` is configured. Implements the same idempotence contract
//! as [`crate::postgres::PostgresEventStore`].

use async_trait::async_trait;
use oracle_domain::{EventRowStatus, NewEventRow, PersistedEventRow};
use oracle_ports::{EventStore, EventStoreError};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryEventStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: Vec<PersistedEventRow>,
    keys: HashSet<(String, String, String, u64)>,
    cursors: HashMap<(String, String), u64>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows recorded so far, for assertions in tests.
    pub fn rows(&self) -> Vec<PersistedEventRow> {
        self.inner.lock().expect("lock poisoned").rows.clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn latest_cursor(
        &self,
        chain: &str,
        oracle: &str,
    ) -> Result<Option<u64>, EventStoreError> {
        let inner = self.inner.lock().expect("lock poisoned");
        Ok(inner
            .cursors
            .get(&(chain.to_string(), oracle.to_string()))
            .copied())
    }

    async fn record_attempt(&self, row: NewEventRow) -> Result<(), EventStoreError> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let key = row.idempotence_key();
        if inner.keys.contains(&key) {
            return Ok(());
        }
        inner.keys.insert(key);

        let cursor_key = (row.chain.clone(), row.oracle_address.clone());
        let advanced = inner
            .cursors
            .get(&cursor_key)
            .map(|&cur| row.event_seq > cur)
            .unwrap_or(true);
        if advanced {
            inner.cursors.insert(cursor_key, row.event_seq);
        }

        let now = chrono::Utc::now();
        let id = inner.rows.len() as i64 + 1;
        inner.rows.push(PersistedEventRow {
            id,
            chain: row.chain,
            oracle_address: row.oracle_address,
            event_handle_id: row.event_handle_id,
            event_seq: row.event_seq,
            event_index: row.event_index,
            event_type: row.event_type,
            event_data: row.event_data,
            decoded_event_data: row.decoded_event_data,
            status: row.status,
            retries: if row.status == EventRowStatus::Failed {
                1
            } else {
                0
            },
            response: row.response,
            indexed_at: now,
            updated_at: now,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_domain::EventRowStatus;

    fn row(chain: &str, oracle: &str, seq: u64) -> NewEventRow {
        NewEventRow {
            chain: chain.into(),
            oracle_address: oracle.into(),
            event_handle_id: "handle".into(),
            event_seq: seq,
            event_index: 0,
            event_type: "RequestAdded".into(),
            event_data: "{}".into(),
            decoded_event_data: "{}".into(),
            status: EventRowStatus::Success,
            response: "{}".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_idempotence_key_is_a_no_op() {
        let store = InMemoryEventStore::new();
        store.record_attempt(row("rooch", "0xabc", 1)).await.unwrap();
        store.record_attempt(row("rooch", "0xabc", 1)).await.unwrap();
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn cursor_is_monotonic() {
        let store = InMemoryEventStore::new();
        store.record_attempt(row("rooch", "0xabc", 1)).await.unwrap();
        store.record_attempt(row("rooch", "0xabc", 5)).await.unwrap();
        assert_eq!(
            store.latest_cursor("rooch", "0xabc").await.unwrap(),
            Some(5)
        );

        // An out-of-order replay never moves the cursor backwards.
        store.record_attempt(row("rooch", "0xabc", 2)).await.unwrap();
        assert_eq!(
            store.latest_cursor("rooch", "0xabc").await.unwrap(),
            Some(5)
        );
    }

    #[tokio::test]
    async fn unseen_chain_has_no_cursor() {
        let store = InMemoryEventStore::new();
        assert_eq!(store.latest_cursor("rooch", "0xabc").await.unwrap(), None);
    }
}
