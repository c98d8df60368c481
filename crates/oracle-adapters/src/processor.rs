//! Request processor: turns a decoded request event into the
//! `{status, message}` pair reported on chain.

use crate::registry::{IntegrationRegistry, RegistryError};
use oracle_domain::{pick, HttpMethod, HttpRequestSpec, ProcessOutcome, RequestEvent};
use oracle_ports::ProofVerifier;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{instrument, warn};

pub struct RequestProcessor<'a> {
    pub orchestrator_address: &'a str,
    pub registry: &'a IntegrationRegistry,
    pub proof_verifier: Option<&'a (dyn ProofVerifier + Sync)>,
}

impl<'a> RequestProcessor<'a> {
    /// Returns `None` when the event is not addressed to this orchestrator
    /// — the caller must not persist anything for it.
    #[instrument(skip(self, event), fields(request_id = %event.request_id))]
    pub async fn process(&self, event: &RequestEvent) -> Option<ProcessOutcome> {
        if event.oracle != self.orchestrator_address {
            return None;
        }

        Some(self.process_owned(event).await)
    }

    async fn process_owned(&self, event: &RequestEvent) -> ProcessOutcome {
        let raw_url = normalize_url(&event.params.url);
        let url = match reqwest::Url::parse(&raw_url) {
            Ok(url) => url,
            Err(_) => return ProcessOutcome::invalid_url(),
        };
        let Some(host) = url.host_str() else {
            return ProcessOutcome::invalid_url();
        };

        let Some(handler) = self.registry.select(host, url.path()) else {
            return ProcessOutcome::url_not_supported();
        };

        if !handler
            .spec
            .validator
            .validate(url.path(), &event.params.body)
        {
            return ProcessOutcome::invalid_payload();
        }

        let method = match HttpMethod::from_str(&event.params.method) {
            Ok(method) => method,
            Err(e) => {
                warn!(error = %e, "event carried an unrecognised HTTP method");
                return ProcessOutcome::internal_error();
            }
        };

        let headers = parse_header_map(&event.params.headers);
        let request = HttpRequestSpec {
            method,
            url: url.to_string(),
            headers,
            body: event.params.body.clone(),
        };

        let response = match self.registry.submit_request(&handler, request).await {
            Ok(response) => response,
            Err(RegistryError::MissingCredential) => return ProcessOutcome::new(401, "Missing credentials"),
            Err(RegistryError::Transport { .. }) => return ProcessOutcome::no_response(),
            Err(RegistryError::NoMatch) => return ProcessOutcome::url_not_supported(),
        };

        if !response.is_success() {
            return ProcessOutcome::upstream(response.status, response.body);
        }

        if handler.spec.proof_mode {
            return self.apply_proof(&response).await;
        }

        match pick(&event.pick, &response.body) {
            Ok(projected) => ProcessOutcome::new(response.status, projected),
            Err(e) => {
                warn!(error = %e, "pick projection failed");
                ProcessOutcome::pick_failed()
            }
        }
    }

    async fn apply_proof(&self, response: &oracle_domain::HttpResponse) -> ProcessOutcome {
        let Some(verifier) = self.proof_verifier else {
            warn!("handler configured for proof mode but no proof verifier is available");
            return ProcessOutcome::proof_verification_failed();
        };

        match verifier.verify(response.body.as_bytes(), "").await {
            Ok(attestation) => {
                let proof_generated = attestation.first_full_proof().unwrap_or_default().to_string();
                ProcessOutcome::with_proof(
                    response.status,
                    response.body.clone(),
                    proof_generated,
                    attestation.signature,
                )
            }
            Err(_) => ProcessOutcome::proof_verification_failed(),
        }
    }
}

/// Prepend `https://` when the URL lacks a scheme.
fn normalize_url(raw: &str) -> String {
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

/// Headers are JSON-decoded only if they parse as a JSON object; otherwise
/// no custom headers are added.
fn parse_header_map(raw: &str) -> HashMap<String, String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return HashMap::new();
    };
    let Some(obj) = value.as_object() else {
        return HashMap::new();
    };
    obj.iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}
