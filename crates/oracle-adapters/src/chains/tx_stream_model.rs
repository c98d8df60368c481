//! Transaction-stream cursor model: events arrive embedded in an ordered
//! stream of transactions, so the cursor is a composite of transaction
//! version and the event's position within it, packed into a single `u64`
//! (`version * 10_000 + event_index`). Modeled on an Aptos-style indexer
//! GraphQL API.

use super::{address_from_signing_key, build_request_event, sign_hex, signing_key_from_hex, RequestAddedPayload};
use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use oracle_domain::RequestEvent;
use oracle_ports::{ChainAdapter, ChainError, SubmitReceipt};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

const CURSOR_SCALE: u64 = 10_000;

pub struct TxStreamModelAdapter {
    chain_id: String,
    oracle_address: String,
    module: String,
    graphql_url: String,
    rpc_url: String,
    signing_key: SigningKey,
    http: reqwest::Client,
}

impl TxStreamModelAdapter {
    pub fn new(
        chain_id: impl Into<String>,
        module: impl Into<String>,
        graphql_url: impl Into<String>,
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
            graphql_url: graphql_url.into(),
            rpc_url: rpc_url.into(),
            signing_key,
            http,
        })
    }

    fn pack_cursor(version: u64, event_index: u64) -> u64 {
        version * CURSOR_SCALE + event_index
    }

    fn unpack_version(cursor: u64) -> u64 {
        cursor / CURSOR_SCALE
    }
}

/// `transaction_version` alone is not fine-grained enough to page within a
/// transaction that carries more than one matching event, so the GraphQL
/// query asks for everything from `since_version` onward and the already-
/// delivered events at exactly `since_version` are dropped here using the
/// full packed cursor.
fn drop_already_delivered(events: Vec<GraphQlEvent>, since_cursor: Option<u64>) -> Vec<GraphQlEvent> {
    let Some(since_cursor) = since_cursor else {
        return events;
    };
    events
        .into_iter()
        .filter(|e| TxStreamModelAdapter::pack_cursor(e.transaction_version, e.event_index) > since_cursor)
        .collect()
}

#[derive(Deserialize)]
struct GraphQlEvent {
    transaction_version: u64,
    event_index: u64,
    data: RequestAddedPayload,
}

#[derive(Deserialize)]
struct GraphQlEvents {
    events: Vec<GraphQlEvent>,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: GraphQlEvents,
}

#[async_trait]
impl ChainAdapter for TxStreamModelAdapter {
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
        let since_version = since_cursor.map(Self::unpack_version).unwrap_or(0);
        let query = json!({
            "query": r#"
                query RequestAddedEvents($account: String!, $module: String!, $since: bigint!, $limit: Int!) {
                    events(
                        where: {account_address: {_eq: $account}, type: {_eq: $module}, transaction_version: {_gte: $since}}
                        order_by: {transaction_version: asc, event_index: asc}
                        limit: $limit
                    ) { transaction_version event_index data }
                }
            "#,
            "variables": {
                "account": self.oracle_address,
                "module": format!("{}::RequestAddedEvent", self.module),
                "since": since_version,
                "limit": batch_size,
            },
        });

        let response = self
            .http
            .post(&self.graphql_url)
            .json(&query)
            .send()
            .await
            .map_err(|e| ChainError::Rpc {
                message: e.to_string(),
            })?;
        let parsed: GraphQlResponse = response.json().await.map_err(|e| ChainError::Decode {
            message: e.to_string(),
        })?;

        drop_already_delivered(parsed.data.events, since_cursor)
            .into_iter()
            .map(|entry| {
                let cursor = Self::pack_cursor(entry.transaction_version, entry.event_index);
                let raw = serde_json::to_string(&serde_json::json!({
                    "transaction_version": entry.transaction_version,
                    "event_index": entry.event_index,
                }))
                .unwrap_or_default();
                build_request_event(
                    entry.data,
                    entry.transaction_version.to_string(),
                    cursor,
                    entry.event_index,
                    raw,
                )
            })
            .collect()
    }

    async fn is_already_fulfilled(&self, request_id: &str) -> Result<bool, ChainError> {
        let body = json!({
            "function": format!("{}::get_response_status", self.module),
            "type_arguments": [],
            "arguments": [self.oracle_address, request_id],
        });
        let response = self
            .http
            .post(format!("{}/view", self.rpc_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Rpc {
                message: e.to_string(),
            })?;
        let result: Vec<u64> = response.json().await.map_err(|e| ChainError::Decode {
            message: e.to_string(),
        })?;
        Ok(result.first().copied().unwrap_or(0) != 0)
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
            "function": format!("{}::fulfil_request", self.module),
            "arguments": [request_id, status, message],
        });
        let signature = sign_hex(&self.signing_key, payload.to_string().as_bytes());
        let submission = json!({"payload": payload, "signature": signature});

        let response = self
            .http
            .post(format!("{}/transactions", self.rpc_url))
            .json(&submission)
            .send()
            .await
            .map_err(|e| ChainError::SubmissionFailed {
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ChainError::SubmissionFailed {
                message: format!("submission returned {}", response.status()),
            });
        }
        let body: serde_json::Value = response.json().await.map_err(|e| ChainError::Decode {
            message: e.to_string(),
        })?;
        let tx_hash = body.get("hash").and_then(|v| v.as_str()).map(str::to_string);
        Ok(SubmitReceipt {
            tx_hash,
            skipped: false,
        })
    }
}
