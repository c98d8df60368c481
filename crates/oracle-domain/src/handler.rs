//! Static shape of an integration handler.
//!
//! The mutable runtime state — the current bearer token once obtained, and
//! the `lastExecutedAt` rate-limit watermark — lives in `oracle-adapters`,
//! which owns the locks that keep per-handler rate limiting correct under
//! concurrency. This module only carries what's fixed at registration time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a handler obtains the credential it attaches as
/// `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthKind {
    /// No outbound credential is attached.
    None,
    /// A fixed token supplied at startup.
    StaticBearer,
    /// POST form-encoded `grant_type=client_credentials` with basic auth
    /// against a token endpoint at startup (the Twitter-style baseline
    /// handler).
    OAuth2ClientCredentials,
    /// A pre-signed OAuth1 token supplied at startup; the orchestrator does
    /// not perform per-request OAuth1 request signing (see DESIGN.md).
    OAuth1,
}

/// The small, closed set of payload validators: accept-all, and the OpenAI
/// chat-completion schema check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorKind {
    AcceptAll,
    OpenAiChatCompletion { allowed_models: Vec<String> },
}

impl ValidatorKind {
    /// Validate a request body for a given URL path.
    pub fn validate(&self, _path: &str, body: &str) -> bool {
        match self {
            ValidatorKind::AcceptAll => true,
            ValidatorKind::OpenAiChatCompletion { allowed_models } => {
                validate_openai_chat_completion(body, allowed_models)
            }
        }
    }
}

fn validate_openai_chat_completion(body: &str, allowed_models: &[String]) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    let Some(obj) = value.as_object() else {
        return false;
    };

    if let Some(model) = obj.get("model") {
        let Some(model) = model.as_str() else {
            return false;
        };
        if model != "gpt-4o" && !allowed_models.iter().any(|m| m == model) {
            return false;
        }
    }

    let Some(messages) = obj.get("messages").and_then(|m| m.as_array()) else {
        return false;
    };
    messages.iter().all(|message| {
        let Some(message) = message.as_object() else {
            return false;
        };
        matches!(message.get("role"), Some(v) if v.is_string())
            && matches!(message.get("content"), Some(v) if v.is_string())
    })
}

/// Static registration-time configuration for one integration handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerSpec {
    pub name: String,
    pub hosts: HashSet<String>,
    pub paths: Vec<String>,
    pub min_interval_ms: u64,
    pub validator: ValidatorKind,
    pub auth: AuthKind,
    /// A handler with a static bearer token supplies it here; OAuth2/OAuth1
    /// handlers leave this empty and have it filled in by credential
    /// bootstrap (oracle-adapters).
    pub static_token: Option<String>,
    /// Whether responses through this handler are routed through the proof
    /// verifier. Explicit per handler, never inferred.
    pub proof_mode: bool,
}

impl HandlerSpec {
    /// A handler matches iff its host set contains the URL host and at
    /// least one of its path prefixes is a prefix of the URL path.
    pub fn matches(&self, host: &str, path: &str) -> bool {
        self.hosts.contains(host) && self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_requires_host_and_path_prefix() {
        let spec = HandlerSpec {
            name: "twitter".into(),
            hosts: ["api.x.com".to_string()].into_iter().collect(),
            paths: vec!["/2/tweets".into(), "/2/users/".into()],
            min_interval_ms: 60_000,
            validator: ValidatorKind::AcceptAll,
            auth: AuthKind::OAuth2ClientCredentials,
            static_token: None,
            proof_mode: false,
        };

        assert!(spec.matches("api.x.com", "/2/users/by/username/elonmusk"));
        assert!(!spec.matches("api.x.com", "/1.1/statuses/update"));
        assert!(!spec.matches("evil.example.com", "/2/tweets"));
    }

    #[test]
    fn openai_validator_rejects_non_gpt4o_model() {
        let v = ValidatorKind::OpenAiChatCompletion {
            allowed_models: vec![],
        };
        let body = r#"{"model":"gpt-3.5-turbo","messages":[{"role":"user","content":"hi"}]}"#;
        assert!(!v.validate("/v1/chat/completions", body));
    }

    #[test]
    fn openai_validator_accepts_gpt4o() {
        let v = ValidatorKind::OpenAiChatCompletion {
            allowed_models: vec![],
        };
        let body = r#"{"model":"gpt-4o","messages":[{"role":"user","content":"hi"}]}"#;
        assert!(v.validate("/v1/chat/completions", body));
    }

    #[test]
    fn openai_validator_rejects_malformed_body() {
        let v = ValidatorKind::OpenAiChatCompletion {
            allowed_models: vec![],
        };
        assert!(!v.validate("/v1/chat/completions", "not json"));
    }
}
