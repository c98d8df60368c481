//! Baseline integration handlers and the credential bootstrap they need at
//! startup.

use oracle_domain::{AuthKind, HandlerSpec, ValidatorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("token endpoint request failed: {message}")]
    Request { message: String },

    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("token endpoint response missing access_token")]
    MissingAccessToken,
}

/// Twitter-style handler: hosts `api.x.com`/`api.twitter.com`, accepts any
/// payload, 60s rate limit, credentials via OAuth2 client-credentials.
pub fn twitter_handler_spec() -> HandlerSpec {
    HandlerSpec {
        name: "twitter".to_string(),
        hosts: ["api.x.com", "api.twitter.com"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        paths: vec!["/2/tweets".to_string(), "/2/users/".to_string()],
        min_interval_ms: 60_000,
        validator: ValidatorKind::AcceptAll,
        auth: AuthKind::OAuth2ClientCredentials,
        static_token: None,
        proof_mode: false,
    }
}

/// Same handler, for deployments that supply a pre-obtained bearer token
/// instead of OAuth2 client-credentials.
pub fn twitter_handler_spec_with_bearer(token: String) -> HandlerSpec {
    HandlerSpec {
        auth: AuthKind::StaticBearer,
        static_token: Some(token),
        ..twitter_handler_spec()
    }
}

/// OpenAI-compatible handler: static bearer token, chat-completion schema
/// validation, `gpt-4o` (or explicitly configured models) only.
pub fn openai_handler_spec(token: String, allowed_models: Vec<String>) -> HandlerSpec {
    HandlerSpec {
        name: "openai".to_string(),
        hosts: ["api.openai.com".to_string()].into_iter().collect(),
        paths: vec!["/v1/chat/completions".to_string()],
        min_interval_ms: 60_000,
        validator: ValidatorKind::OpenAiChatCompletion { allowed_models },
        auth: AuthKind::StaticBearer,
        static_token: Some(token),
        proof_mode: false,
    }
}

/// Perform the client-credentials exchange: POST form-encoded
/// `grant_type=client_credentials` with HTTP basic auth against the
/// provider's token endpoint, returning `access_token`.
pub async fn fetch_oauth2_client_credentials_token(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String, CredentialError> {
    let response = client
        .post(token_url)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|e| CredentialError::Request {
            message: e.to_string(),
        })?;

    let status = response.status().as_u16();
    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        return Err(CredentialError::Rejected { status, body });
    }

    let body: serde_json::Value = response.json().await.map_err(|e| CredentialError::Request {
        message: e.to_string(),
    })?;

    body.get("access_token")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or(CredentialError::MissingAccessToken)
}
