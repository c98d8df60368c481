//! Native event-handle cursor model: one append-only event handle per
//! oracle module, cursor is the handle's own strictly increasing
//! `event_seq`. Modeled on Rooch-style JSON-RPC nodes.

use super::{address_from_signing_key, build_request_event, sign_hex, signing_key_from_hex, RequestAddedPayload};
use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use oracle_domain::RequestEvent;
use oracle_ports::{ChainAdapter, ChainError, SubmitReceipt};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

pub struct HandleModelAdapter {
    chain_id: String,
    oracle_address: String,
    module: String,
    rpc_url: String,
    signing_key: SigningKey,
    http: reqwest::Client,
}

impl HandleModelAdapter {
    pub fn new(
        chain_id: impl Into<String>,
        module: impl Into<String>,
        rpc_url: impl Into<String>,
        private_key_hex: &str,
        http: reqwest::Client,
    ) -> Result<Self, ChainError> {
        let signing_key = signing_key_from_hex(private_key_hex)?;
        let oracle_address = address_from_signing_key(&signing_key);
        Ok(Self {
            chain_id: chain_id.into(),
            oracle_address,
            module: module.into(),
            rpc_url: rpc_url.into(),
            signing_key,
            http,
        })
    }

    fn event_handle_type(&self) -> String {
        format!("{}::{}::RequestAddedEvent", self.oracle_address, self.module)
    }

    fn fulfil_function(&self) -> String {
        format!("{}::{}::fulfil_request", self.oracle_address, self.module)
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, ChainError> {
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Rpc {
                message: e.to_string(),
            })?;
        let value: serde_json::Value = response.json().await.map_err(|e| ChainError::Rpc {
            message: e.to_string(),
        })?;
        if let Some(error) = value.get("error") {
            return Err(ChainError::Rpc {
                message: error.to_string(),
            });
        }
        value
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::Rpc {
                message: "response missing result field".to_string(),
            })
    }
}

#[derive(Deserialize)]
struct EventHandleKey {
    event_handle_id: String,
    event_seq: u64,
}

#[derive(Deserialize)]
struct EventHandleEntry {
    event_id: EventHandleKey,
    event_index: u64,
    decoded_event_data: RequestAddedPayload,
    event_data: String,
}

#[derive(Deserialize)]
struct EventPage {
    data: Vec<EventHandleEntry>,
}

#[async_trait]
impl ChainAdapter for HandleModelAdapter {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn oracle_address(&self) -> &str {
        &self.oracle_address
    }

    #[instrument(skip(self), fields(chain = %self.chain_id, since_cursor = ?since_cursor))]
    async fn fetch_events(
        &self,
        since_cursor: Option<u64>,
        batch_size: usize,
    ) -> Result<Vec<RequestEvent>, ChainError> {
        let cursor = since_cursor.map(|c| c + 1).unwrap_or(0);
        let result = self
            .call(
                "rooch_getEventsByEventHandle",
                json!({
                    "event_handle_type": self.event_handle_type(),
                    "cursor": cursor,
                    "limit": batch_size,
                    "descending_order": false,
                }),
            )
            .await?;
        let page: EventPage = serde_json::from_value(result).map_err(|e| ChainError::Decode {
            message: e.to_string(),
        })?;

        page.data
            .into_iter()
            .map(|entry| {
                let raw = entry.event_data.clone();
                build_request_event(
                    entry.decoded_event_data,
                    entry.event_id.event_handle_id,
                    entry.event_id.event_seq,
                    entry.event_index,
                    raw,
                )
            })
            .collect()
    }

    async fn is_already_fulfilled(&self, request_id: &str) -> Result<bool, ChainError> {
        let result = self
            .call(
                "rooch_executeViewFunction",
                json!({
                    "function": format!("{}::{}::get_response_status", self.oracle_address, self.module),
                    "args": [request_id],
                }),
            )
            .await?;
        let status: u64 = serde_json::from_value(result).map_err(|e| ChainError::Decode {
            message: e.to_string(),
        })?;
        Ok(status != 0)
    }

    #[instrument(skip(self, message), fields(chain = %self.chain_id, request_id = %request_id, status = status))]
    async fn submit(
        &self,
        request_id: &str,
        status: u16,
        message: &str,
    ) -> Result<SubmitReceipt, ChainError> {
        if self.is_already_fulfilled(request_id).await? {
            return Ok(SubmitReceipt {
                tx_hash: None,
                skipped: true,
            });
        }

        let payload = json!({
            "function": self.fulfil_function(),
            "args": [request_id, status, message],
        });
        let signature = sign_hex(&self.signing_key, payload.to_string().as_bytes());
        let result = self
            .call(
                "rooch_sendRawTransaction",
                json!({
                    "payload": payload,
                    "signature": signature,
                    "sender": self.oracle_address,
                }),
            )
            .await?;
        let tx_hash = result.get("tx_hash").and_then(|v| v.as_str()).map(str::to_string);
        Ok(SubmitReceipt {
            tx_hash,
            skipped: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key_hex() -> String {
        "03".repeat(32)
    }

    #[tokio::test]
    async fn fetch_events_decodes_a_page_of_handle_events() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "data": [{
                        "event_id": {"event_handle_id": "handle-1", "event_seq": 7},
                        "event_index": 0,
                        "event_data": "0xdeadbeef",
                        "decoded_event_data": {
                            "request_id": "req-7",
                            "oracle": "0xaaa",
                            "url": "api.x.com/2/tweets",
                            "method": "GET",
                            "pick": "."
                        }
                    }]
                }
            })))
            .mount(&server)
            .await;

        let adapter = HandleModelAdapter::new(
            "ROOCH-testnet",
            "oracle",
            server.uri(),
            &key_hex(),
            reqwest::Client::new(),
        )
        .unwrap();

        let events = adapter.fetch_events(Some(6), 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id.seq, 7);
        assert_eq!(events[0].request_id, "req-7");
    }

    #[tokio::test]
    async fn is_already_fulfilled_reads_nonzero_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": 200,
            })))
            .mount(&server)
            .await;

        let adapter = HandleModelAdapter::new(
            "ROOCH-testnet",
            "oracle",
            server.uri(),
            &key_hex(),
            reqwest::Client::new(),
        )
        .unwrap();

        assert!(adapter.is_already_fulfilled("req-7").await.unwrap());
    }

    #[tokio::test]
    async fn rpc_error_response_surfaces_as_chain_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32000, "message": "node unavailable"},
            })))
            .mount(&server)
            .await;

        let adapter = HandleModelAdapter::new(
            "ROOCH-testnet",
            "oracle",
            server.uri(),
            &key_hex(),
            reqwest::Client::new(),
        )
        .unwrap();

        assert!(adapter.fetch_events(None, 10).await.is_err());
    }
}
