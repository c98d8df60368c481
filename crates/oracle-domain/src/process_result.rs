//! The `{status, message}` outcome of processing one request event, and the
//! fixed status/message pairs used across the error taxonomy.

use serde::{Deserialize, Serialize};

/// What gets reported on chain via `fulfil_request`. All of these are
/// *successful deliveries* from the orchestrator's point of view — only an
/// inability to submit the transaction itself is a delivery failure
/// (tracked separately as [`crate::EventRowStatus`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub status: u16,
    pub message: String,
    /// Present only when the handler runs in proof mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_generated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ProcessOutcome {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            proof_generated: None,
            signature: None,
        }
    }

    pub fn with_proof(
        status: u16,
        message: impl Into<String>,
        proof_generated: String,
        signature: String,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            proof_generated: Some(proof_generated),
            signature: Some(signature),
        }
    }

    /// URL parse failure or no handler matches.
    pub fn invalid_url() -> Self {
        Self::new(406, "Invalid URL")
    }

    /// No handler matches the URL.
    pub fn url_not_supported() -> Self {
        Self::new(406, "URL Not supported")
    }

    /// The handler's validator rejected the body.
    pub fn invalid_payload() -> Self {
        Self::new(406, "Invalid Payload")
    }

    /// Transport error or timeout reaching the upstream.
    pub fn no_response() -> Self {
        Self::new(504, "No response received")
    }

    /// `pick` could not resolve on the response.
    pub fn pick_failed() -> Self {
        Self::new(
            409,
            "'Pick' value provided could not be resolved on the returned response",
        )
    }

    /// The remote proof verifier rejected the proof.
    pub fn proof_verification_failed() -> Self {
        Self::new(409, "Proof verification failed")
    }

    /// Anything else unexpected.
    pub fn internal_error() -> Self {
        Self::new(500, "Unexpected error")
    }

    /// Verbatim upstream HTTP error, forwarded as-is.
    pub fn upstream(status: u16, body: String) -> Self {
        Self::new(status, body)
    }
}
