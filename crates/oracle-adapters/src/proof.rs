//! HTTP-based proof verifier: POSTs the upstream response bytes to a
//! notary/prover service and turns its attestation into a `ProofAttestation`.
//! Proof verification is optional; when no verifier is configured the
//! request processor treats every proof-mode handler as failing.

use async_trait::async_trait;
use oracle_ports::{ProofAttestation, ProofError, ProofResult, ProofVerifier};
use serde::Deserialize;
use tracing::instrument;

pub struct HttpProofVerifier {
    prover_url: String,
    http: reqwest::Client,
}

impl HttpProofVerifier {
    pub fn new(prover_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            prover_url: prover_url.into(),
            http,
        }
    }
}

#[derive(Deserialize)]
struct ProveResponse {
    signature: String,
    root: String,
    results: Vec<ProveResult>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ProveResult {
    SessionProof { value: String },
    FullProof { value: String },
}

#[async_trait]
impl ProofVerifier for HttpProofVerifier {
    #[instrument(skip(self, proof_bytes, notary_pub_key))]
    async fn verify(
        &self,
        proof_bytes: &[u8],
        notary_pub_key: &str,
    ) -> Result<ProofAttestation, ProofError> {
        let response = self
            .http
            .post(&self.prover_url)
            .header("Content-Type", "application/octet-stream")
            .header("X-Notary-Public-Key", notary_pub_key)
            .body(proof_bytes.to_vec())
            .send()
            .await
            .map_err(|e| ProofError::Unavailable {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProofError::Rejected {
                message: format!("prover returned {status}: {body}"),
            });
        }

        let parsed: ProveResponse = response.json().await.map_err(|e| ProofError::Rejected {
            message: e.to_string(),
        })?;

        Ok(ProofAttestation {
            signature: parsed.signature,
            root: parsed.root,
            results: parsed
                .results
                .into_iter()
                .map(|r| match r {
                    ProveResult::SessionProof { value } => ProofResult::SessionProof(value),
                    ProveResult::FullProof { value } => ProofResult::FullProof(value),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn verify_parses_full_and_session_proofs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "signature": "sig-abc",
                "root": "root-abc",
                "results": [
                    {"kind": "session_proof", "value": "session-1"},
                    {"kind": "full_proof", "value": "full-1"},
                ]
            })))
            .mount(&server)
            .await;

        let verifier = HttpProofVerifier::new(server.uri(), reqwest::Client::new());
        let attestation = verifier.verify(b"proof-bytes", "notary-key").await.unwrap();
        assert_eq!(attestation.signature, "sig-abc");
        assert_eq!(attestation.first_full_proof(), Some("full-1"));
    }

    #[tokio::test]
    async fn verify_maps_non_2xx_to_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad proof"))
            .mount(&server)
            .await;

        let verifier = HttpProofVerifier::new(server.uri(), reqwest::Client::new());
        let err = verifier.verify(b"proof-bytes", "notary-key").await.unwrap_err();
        assert!(matches!(err, ProofError::Rejected { .. }));
    }
}
