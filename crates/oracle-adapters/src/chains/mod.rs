//! Chain adapters: one implementation per event-cursor model. All three
//! decode the same `RequestAdded` payload shape out of whatever envelope
//! their chain wraps it in, and sign `fulfil_request` calls the same way, so
//! the shared plumbing lives here and each model file only supplies the
//! wire format and cursor semantics that are actually different.

pub mod handle_model;
pub mod object_event_model;
pub mod tx_stream_model;

pub use handle_model::HandleModelAdapter;
pub use object_event_model::ObjectEventModelAdapter;
pub use tx_stream_model::TxStreamModelAdapter;

use ed25519_dalek::{Signer, SigningKey};
use oracle_domain::{EventId, NotifyDescriptor, RequestEvent, RequestParams};
use oracle_ports::ChainError;
use serde::Deserialize;

/// The payload every `RequestAdded` event carries, independent of the
/// envelope the originating chain puts around it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RequestAddedPayload {
    pub request_id: String,
    pub oracle: String,
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: String,
    #[serde(default)]
    pub body: String,
    pub pick: String,
    #[serde(default)]
    pub notify: Option<String>,
}

/// Turn a decoded payload plus its chain-assigned cursor position into the
/// `RequestEvent` the request processor consumes.
pub(crate) fn build_request_event(
    payload: RequestAddedPayload,
    handle_id: String,
    seq: u64,
    event_index: u64,
    raw_payload: String,
) -> Result<RequestEvent, ChainError> {
    let notify = payload
        .notify
        .as_deref()
        .map(NotifyDescriptor::parse)
        .transpose()
        .map_err(|e| ChainError::Decode {
            message: e.to_string(),
        })?;

    Ok(RequestEvent {
        request_id: payload.request_id,
        oracle: payload.oracle,
        params: RequestParams {
            url: payload.url,
            method: payload.method,
            headers: payload.headers,
            body: payload.body,
        },
        pick: payload.pick,
        notify,
        event_id: EventId::new(handle_id, seq),
        event_index,
        raw_payload,
    })
}

/// `0x<hex-encoded ed25519 public key>` — the orchestrator's address on
/// every simulated chain family derives from the same keypair this way.
pub(crate) fn address_from_signing_key(signing_key: &SigningKey) -> String {
    format!("0x{}", hex::encode(signing_key.verifying_key().to_bytes()))
}

pub(crate) fn signing_key_from_hex(private_key_hex: &str) -> Result<SigningKey, ChainError> {
    let trimmed = private_key_hex.trim_start_matches("0x");
    let bytes = hex::decode(trimmed).map_err(|e| ChainError::Signing {
        message: e.to_string(),
    })?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| ChainError::Signing {
        message: "private key must be 32 bytes".to_string(),
    })?;
    Ok(SigningKey::from_bytes(&bytes))
}

pub(crate) fn sign_hex(signing_key: &SigningKey, message: &[u8]) -> String {
    hex::encode(signing_key.sign(message).to_bytes())
}
