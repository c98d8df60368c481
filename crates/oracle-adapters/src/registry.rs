//! Integration registry: an ordered table of handlers, host/path selection,
//! credential bootstrap, and the process-global per-handler rate limiter.

use crate::handlers::{self, CredentialError};
use oracle_domain::{AuthKind, AuthType, HandlerSpec, HttpRequestSpec, HttpResponse, SupportedUrl};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no handler matches the URL")]
    NoMatch,

    #[error("handler has no usable credential")]
    MissingCredential,

    #[error("transport error: {message}")]
    Transport { message: String },
}

/// Registration-time spec plus the runtime state that mutates after
/// startup: the current bearer token (refreshed under its own lock) and the
/// rate-limit watermark.
pub struct HandlerState {
    pub spec: HandlerSpec,
    token: RwLock<Option<String>>,
    last_executed: Mutex<Option<Instant>>,
}

impl HandlerState {
    fn new(spec: HandlerSpec) -> Self {
        let token = spec.static_token.clone();
        Self {
            spec,
            token: RwLock::new(token),
            last_executed: Mutex::new(None),
        }
    }

    pub async fn current_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn set_token(&self, token: String) {
        *self.token.write().await = Some(token);
    }
}

pub struct IntegrationRegistry {
    handlers: Vec<Arc<HandlerState>>,
    http_client: reqwest::Client,
}

impl IntegrationRegistry {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            handlers: Vec::new(),
            http_client,
        }
    }

    /// Register a handler in the given order; earlier registrations win
    /// ties in `select`, which scans in registration order.
    pub fn register(&mut self, spec: HandlerSpec) -> Arc<HandlerState> {
        let state = Arc::new(HandlerState::new(spec));
        self.handlers.push(state.clone());
        state
    }

    pub fn handlers(&self) -> &[Arc<HandlerState>] {
        &self.handlers
    }

    /// First handler whose host set contains `host` and whose path
    /// prefixes include a prefix of `path`.
    pub fn select(&self, host: &str, path: &str) -> Option<Arc<HandlerState>> {
        self.handlers
            .iter()
            .find(|h| h.spec.matches(host, path))
            .cloned()
    }

    /// Build a handler dynamically from a `SupportedUrl` row loaded at boot.
    pub fn register_supported_url(&mut self, row: SupportedUrl) -> Arc<HandlerState> {
        let auth = match row.auth_type {
            AuthType::Bearer => AuthKind::StaticBearer,
            AuthType::Oauth1 => AuthKind::OAuth1,
            AuthType::Oauth2 => AuthKind::OAuth2ClientCredentials,
        };
        let static_token = matches!(auth, AuthKind::StaticBearer | AuthKind::OAuth1)
            .then(|| row.auth_key.clone());

        let spec = HandlerSpec {
            name: row.domain.clone(),
            hosts: [row.domain].into_iter().collect(),
            paths: row.supported_paths,
            min_interval_ms: row.request_rate_ms,
            validator: oracle_domain::ValidatorKind::AcceptAll,
            auth,
            static_token,
            proof_mode: false,
        };
        self.register(spec)
    }

    /// Acquire a credential for every handler that needs one it doesn't
    /// already have. Handlers that fail to bootstrap stay registered, and
    /// every `process` call through them fails fast
    /// (`RegistryError::MissingCredential`).
    #[instrument(skip(self, oauth2_credentials))]
    pub async fn bootstrap_credentials(
        &self,
        oauth2_credentials: &HashMap<String, (String, String, String)>,
    ) {
        for handler in &self.handlers {
            if handler.spec.auth != AuthKind::OAuth2ClientCredentials {
                continue;
            }
            if handler.current_token().await.is_some() {
                continue;
            }
            let Some((token_url, client_id, client_secret)) =
                oauth2_credentials.get(&handler.spec.name)
            else {
                warn!(
                    handler = %handler.spec.name,
                    "no OAuth2 client credentials configured; handler will fail fast"
                );
                continue;
            };

            match handlers::fetch_oauth2_client_credentials_token(
                &self.http_client,
                token_url,
                client_id,
                client_secret,
            )
            .await
            {
                Ok(token) => {
                    handler.set_token(token).await;
                    info!(handler = %handler.spec.name, "acquired OAuth2 client-credentials token");
                }
                Err(e) => {
                    warn!(handler = %handler.spec.name, error = %e, "credential bootstrap failed");
                }
            }
        }
    }

    /// Refresh a single handler's credential (e.g. on 401), serialised by
    /// the handler's own token lock.
    pub async fn refresh_credential(
        &self,
        handler: &Arc<HandlerState>,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<(), CredentialError> {
        let token = handlers::fetch_oauth2_client_credentials_token(
            &self.http_client,
            token_url,
            client_id,
            client_secret,
        )
        .await?;
        handler.set_token(token).await;
        Ok(())
    }

    /// Wait out any remaining window on this handler, then atomically mark
    /// `now` as the new watermark before returning. The read-update must
    /// stay atomic against concurrent callers on the same handler — the
    /// handler's own mutex provides that.
    async fn throttle(&self, handler: &HandlerState) {
        let mut guard = handler.last_executed.lock().await;
        let now = Instant::now();
        if let Some(last) = *guard {
            let min_interval = Duration::from_millis(handler.spec.min_interval_ms);
            let elapsed = now.duration_since(last);
            if elapsed < min_interval {
                tokio::time::sleep(min_interval - elapsed).await;
            }
        }
        *guard = Some(Instant::now());
    }

    /// Execute an outbound call through `handler`, applying the rate limit
    /// and attaching the bearer credential if present.
    #[instrument(skip(self, handler, request), fields(handler = %handler.spec.name))]
    pub async fn submit_request(
        &self,
        handler: &Arc<HandlerState>,
        mut request: HttpRequestSpec,
    ) -> Result<HttpResponse, RegistryError> {
        if handler.spec.auth != AuthKind::None && handler.current_token().await.is_none() {
            return Err(RegistryError::MissingCredential);
        }

        self.throttle(handler).await;

        if let Some(token) = handler.current_token().await {
            request
                .headers
                .insert("Authorization".to_string(), format!("Bearer {token}"));
        }

        let mut builder = self
            .http_client
            .request(to_reqwest_method(request.method), &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| RegistryError::Transport {
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RegistryError::Transport {
                message: e.to_string(),
            })?;

        Ok(HttpResponse { status, body })
    }
}

fn to_reqwest_method(method: oracle_domain::HttpMethod) -> reqwest::Method {
    use oracle_domain::HttpMethod as M;
    match method {
        M::Get => reqwest::Method::GET,
        M::Post => reqwest::Method::POST,
        M::Put => reqwest::Method::PUT,
        M::Patch => reqwest::Method::PATCH,
        M::Delete => reqwest::Method::DELETE,
        M::Head => reqwest::Method::HEAD,
    }
}
