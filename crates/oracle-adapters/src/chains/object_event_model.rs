//! Object/event-type cursor model: events are queried by Move event type
//! across the whole chain, ordered by the checkpoint they were emitted in
//! and their position within it. Modeled on a Sui-style JSON-RPC node.
//! Mirrors the packed-cursor approach of [`super::tx_stream_model`], with
//! `checkpoint` standing in for transaction version.

use super::{address_from_signing_key, build_request_event, sign_hex, signing_key_from_hex, RequestAddedPayload};
use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use oracle_domain::RequestEvent;
use oracle_ports::{ChainAdapter, ChainError, SubmitReceipt};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

const CURSOR_SCALE: u64 = 10_000;

pub struct ObjectEventModelAdapter {
    chain_id: String,
    oracle_address: String,
    package: String,
    module: String,
    rpc_url: String,
    signing_key: SigningKey,
    http: reqwest::Client,
}

impl ObjectEventModelAdapter {
    pub fn new(
        chain_id: impl Into<String>,
        package: impl Into<String>,
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
            package: package.into(),
            module: module.into(),
            rpc_url: rpc_url.into(),
            signing_key,
            http,
        })
    }

    fn event_type(&self) -> String {
        format!("{}::{}::RequestAddedEvent", self.package, self.module)
    }

    fn pack_cursor(checkpoint: u64, seq: u64) -> u64 {
        checkpoint * CURSOR_SCALE + seq
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
struct ObjectEventEntry {
    id: ObjectEventId,
    checkpoint: String,
    #[serde(rename = "parsedJson")]
    parsed_json: RequestAddedPayload,
}

#[derive(Deserialize)]
struct ObjectEventId {
    #[serde(rename = "txDigest")]
    tx_digest: String,
    #[serde(rename = "eventSeq")]
    event_seq: String,
}

#[derive(Deserialize)]
struct QueryEventsResult {
    data: Vec<ObjectEventEntry>,
}

#[async_trait]
impl ChainAdapter for ObjectEventModelAdapter {
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
        let result = self
            .call(
                "suix_queryEvents",
                json!({
                    "query": {"MoveEventType": self.event_type()},
                    "cursor": serde_json::Value::Null,
                    "limit": batch_size,
                    "order": "ascending",
                }),
            )
            .await?;
        let page: QueryEventsResult = serde_json::from_value(result).map_err(|e| ChainError::Decode {
            message: e.to_string(),
        })?;

        let mut events = Vec::new();
        for (position, entry) in page.data.into_iter().enumerate() {
            let checkpoint: u64 = entry.checkpoint.parse().map_err(|_| ChainError::Decode {
                message: format!("invalid checkpoint {:?}", entry.checkpoint),
            })?;
            let event_seq: u64 = entry.id.event_seq.parse().map_err(|_| ChainError::Decode {
                message: format!("invalid eventSeq {:?}", entry.id.event_seq),
            })?;
            let cursor = Self::pack_cursor(checkpoint, event_seq);
            if since_cursor.is_some_and(|since| cursor <= since) {
                continue;
            }
            let raw = entry.id.tx_digest.clone();
            events.push(build_request_event(
                entry.parsed_json,
                entry.id.tx_digest,
                cursor,
                position as u64,
                raw,
            )?);
        }
        Ok(events)
    }

    async fn is_already_fulfilled(&self, request_id: &str) -> Result<bool, ChainError> {
        let result = self
            .call(
                "sui_devInspectTransactionBlock",
                json!({
                    "sender": self.oracle_address,
                    "function": format!("{}::{}::get_response_status", self.package, self.module),
                    "arguments": [request_id],
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
            "sender": self.oracle_address,
            "function": format!("{}::{}::fulfil_request", self.package, self.module),
            "arguments": [request_id, status, message],
        });
        let signature = sign_hex(&self.signing_key, payload.to_string().as_bytes());
        let result = self
            .call(
                "sui_executeTransactionBlock",
                json!({"transactionBlock": payload, "signature": signature}),
            )
            .await?;
        let tx_hash = result
            .get("digest")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Ok(SubmitReceipt {
            tx_hash,
            skipped: false,
        })
    }
}
