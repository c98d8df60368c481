//! End-to-end indexer tick: a stub chain adapter feeds one event through the
//! in-memory store and the integration registry against a real HTTP mock,
//! mirroring how sr-api's integration suite drives a full request through a
//! live-shaped stack instead of unit-testing each layer alone.

use async_trait::async_trait;
use oracle_adapters::{IntegrationRegistry, InMemoryEventStore};
use oracle_domain::{AuthKind, EventId, HandlerSpec, RequestEvent, RequestParams, ValidatorKind};
use oracle_orchestrator::indexer::IndexerTick;
use oracle_ports::{ChainAdapter, ChainError, EventStore, SubmitReceipt};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StubChainAdapter {
    oracle: String,
    event: Mutex<Option<RequestEvent>>,
    submitted: Mutex<Vec<(String, u16, String)>>,
}

#[async_trait]
impl ChainAdapter for StubChainAdapter {
    fn chain_id(&self) -> &str {
        "STUB-testnet"
    }

    fn oracle_address(&self) -> &str {
        &self.oracle
    }

    async fn fetch_events(
        &self,
        _since_cursor: Option<u64>,
        _batch_size: usize,
    ) -> Result<Vec<RequestEvent>, ChainError> {
        Ok(self.event.lock().unwrap().take().into_iter().collect())
    }

    async fn is_already_fulfilled(&self, _request_id: &str) -> Result<bool, ChainError> {
        Ok(false)
    }

    async fn submit(
        &self,
        request_id: &str,
        status: u16,
        message: &str,
    ) -> Result<SubmitReceipt, ChainError> {
        self.submitted
            .lock()
            .unwrap()
            .push((request_id.to_string(), status, message.to_string()));
        Ok(SubmitReceipt {
            tx_hash: Some("0xfeedface".to_string()),
            skipped: false,
        })
    }
}

fn server_host(server: &MockServer) -> String {
    reqwest::Url::parse(&server.uri())
        .unwrap()
        .host_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn one_tick_fetches_processes_submits_and_records_an_event() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/followers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"public_metrics": {"followers_count": 42}})),
        )
        .mount(&server)
        .await;

    let oracle = format!("0x{}", "ab".repeat(32));
    let event = RequestEvent {
        request_id: "req-77".to_string(),
        oracle: oracle.clone(),
        params: RequestParams {
            url: format!("{}/v1/followers", server.uri()),
            method: "GET".to_string(),
            headers: String::new(),
            body: String::new(),
        },
        pick: ".public_metrics.followers_count".to_string(),
        notify: None,
        event_id: EventId::new("handle-stub", 5),
        event_index: 0,
        raw_payload: "{}".to_string(),
    };

    let adapter: Box<dyn ChainAdapter> = Box::new(StubChainAdapter {
        oracle: oracle.clone(),
        event: Mutex::new(Some(event)),
        submitted: Mutex::new(Vec::new()),
    });

    let mut registry = IntegrationRegistry::new(reqwest::Client::new());
    registry.register(HandlerSpec {
        name: "stub-followers".to_string(),
        hosts: [server_host(&server)].into_iter().collect(),
        paths: vec!["/v1/followers".to_string()],
        min_interval_ms: 0,
        validator: ValidatorKind::AcceptAll,
        auth: AuthKind::None,
        static_token: None,
        proof_mode: false,
    });
    let registry = Arc::new(registry);

    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    let tick = IndexerTick::new(adapter, store.clone(), registry, None, 10);

    assert!(tick.run_if_idle().await, "a single tick must run to completion");

    let cursor = store
        .latest_cursor("STUB-testnet", &oracle)
        .await
        .unwrap();
    assert_eq!(cursor, Some(5), "the cursor advances to the delivered event's seq");
}
