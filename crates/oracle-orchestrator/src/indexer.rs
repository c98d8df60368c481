//! Per-chain indexer tick: fetch new events, process and submit each in
//! order, and persist the outcome. One of these runs per configured chain,
//! on its own cron schedule, never overlapping itself.

use oracle_adapters::{IntegrationRegistry, RequestProcessor};
use oracle_domain::{EventRowStatus, NewEventRow};
use oracle_ports::{ChainAdapter, EventStore, ProofVerifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Guards a single chain's tick against overlapping itself when a previous
/// tick is still running.
pub struct IndexerTick {
    adapter: Box<dyn ChainAdapter>,
    store: Arc<dyn EventStore>,
    registry: Arc<IntegrationRegistry>,
    proof_verifier: Option<Arc<dyn ProofVerifier>>,
    batch_size: usize,
    running: AtomicBool,
}

impl IndexerTick {
    pub fn new(
        adapter: Box<dyn ChainAdapter>,
        store: Arc<dyn EventStore>,
        registry: Arc<IntegrationRegistry>,
        proof_verifier: Option<Arc<dyn ProofVerifier>>,
        batch_size: usize,
    ) -> Self {
        Self {
            adapter,
            store,
            registry,
            proof_verifier,
            batch_size,
            running: AtomicBool::new(false),
        }
    }

    pub fn chain_id(&self) -> &str {
        self.adapter.chain_id()
    }

    /// Run one tick if no tick on this chain is currently in flight. Returns
    /// `false` when the tick was dropped because the previous one had not
    /// finished yet.
    #[instrument(skip(self), fields(chain = %self.adapter.chain_id()))]
    pub async fn run_if_idle(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("previous tick still running, dropping this one");
            return false;
        }

        let result = self.tick().await;
        self.running.store(false, Ordering::Release);

        if let Err(e) = result {
            error!(error = %e, "indexer tick failed");
        }
        true
    }

    async fn tick(&self) -> Result<(), oracle_ports::ChainError> {
        let oracle = self.adapter.oracle_address().to_string();
        let cursor = self
            .store
            .latest_cursor(self.adapter.chain_id(), &oracle)
            .await
            .map_err(|e| oracle_ports::ChainError::Rpc {
                message: e.to_string(),
            })?;

        let events = self.adapter.fetch_events(cursor, self.batch_size).await?;
        if events.is_empty() {
            return Ok(());
        }

        info!(count = events.len(), "fetched events");

        let processor = RequestProcessor {
            orchestrator_address: &oracle,
            registry: self.registry.as_ref(),
            proof_verifier: self.proof_verifier.as_deref(),
        };

        for event in &events {
            let Some(outcome) = processor.process(event).await else {
                continue;
            };

            let response_json = serde_json::to_string(&outcome).unwrap_or_default();
            let decoded_event_data = serde_json::to_string(&event.params).unwrap_or_default();

            match self
                .adapter
                .submit(&event.request_id, outcome.status, &outcome.message)
                .await
            {
                Ok(receipt) => {
                    info!(
                        request_id = %event.request_id,
                        status = outcome.status,
                        skipped = receipt.skipped,
                        tx_hash = ?receipt.tx_hash,
                        "fulfilment submitted"
                    );
                    self.record(event, EventRowStatus::Success, response_json, decoded_event_data)
                        .await;
                }
                Err(e) => {
                    error!(request_id = %event.request_id, error = %e, "fulfilment submission failed");
                    self.record(event, EventRowStatus::Failed, response_json, decoded_event_data)
                        .await;
                }
            }
        }

        Ok(())
    }

    async fn record(
        &self,
        event: &oracle_domain::RequestEvent,
        status: EventRowStatus,
        response: String,
        decoded_event_data: String,
    ) {
        let row = NewEventRow {
            chain: self.adapter.chain_id().to_string(),
            oracle_address: self.adapter.oracle_address().to_string(),
            event_handle_id: event.event_id.handle_id.clone(),
            event_seq: event.event_id.seq,
            event_index: event.event_index,
            event_type: "RequestAdded".to_string(),
            event_data: event.raw_payload.clone(),
            decoded_event_data,
            status,
            response,
        };
        if let Err(e) = self.store.record_attempt(row).await {
            error!(request_id = %event.request_id, error = %e, "failed to record event attempt");
        }
    }
}
