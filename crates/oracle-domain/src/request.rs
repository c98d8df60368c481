//! The chain-side request event and its embedded pieces.

use crate::errors::DomainError;
use serde::{Deserialize, Serialize};

/// `(event_handle_id, event_seq)` — the per-chain cursor key for a single
/// event, used together with `(chain, oracle)` as the idempotence key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub handle_id: String,
    pub seq: u64,
}

impl EventId {
    pub fn new(handle_id: impl Into<String>, seq: u64) -> Self {
        Self {
            handle_id: handle_id.into(),
            seq,
        }
    }
}

/// The opaque request parameters embedded in `RequestAdded`.
/// `headers` and `body` are carried as opaque strings — either may be empty
/// or fail to parse as JSON, which the request processor tolerates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestParams {
    pub url: String,
    pub method: String,
    pub headers: String,
    pub body: String,
}

/// Decoded `notify` callback descriptor: `<address>::<function_identifier>`.
/// The core decodes this but never invokes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyDescriptor {
    pub address: String,
    pub function: String,
}

impl NotifyDescriptor {
    /// Parse the `"<address>::<function>"` wire form. The address is the
    /// part before the first `"::"` delimiter; everything after is the
    /// function name (which may itself legally contain `::`, e.g. a module
    /// path, so we split only on the first occurrence).
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.split_once("::") {
            Some((address, function)) if !address.is_empty() && !function.is_empty() => {
                Ok(Self {
                    address: address.to_string(),
                    function: function.to_string(),
                })
            }
            _ => Err(DomainError::MalformedNotify {
                reason: format!("expected '<address>::<function>', got {raw:?}"),
            }),
        }
    }
}

/// A decoded `RequestAdded` event, already translated by the chain adapter
/// out of whatever wire format that chain uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEvent {
    /// Chain-assigned identifier passed back to `fulfil_request`.
    pub request_id: String,
    /// Address the request is addressed to; ignored unless it matches the
    /// orchestrator's own address.
    pub oracle: String,
    pub params: RequestParams,
    /// Path expression applied to the upstream response body.
    pub pick: String,
    /// Optional, decoded but never invoked.
    pub notify: Option<NotifyDescriptor>,
    /// Per-chain cursor key.
    pub event_id: EventId,
    /// Position of this event within its originating transaction/batch, for
    /// diagnostics only — not part of the idempotence key.
    pub event_index: u64,
    /// The untouched wire payload, retained for the persisted event row.
    pub raw_payload: String,
}
