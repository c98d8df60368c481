//! Persisted configuration records: the orchestrator's own keypair record,
//! and the optional dynamically-configured handler table.

use serde::{Deserialize, Serialize};

/// One per `(chain, module)`. Holds the private key the orchestrator signs
/// fulfilment transactions with for that chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keeper {
    pub chain: String,
    pub module: String,
    pub private_key_hex: String,
}

/// Credential scheme a dynamically-configured handler uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthType {
    Bearer,
    Oauth1,
    Oauth2,
}

/// An optional row driving dynamic handler construction at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedUrl {
    pub domain: String,
    pub supported_paths: Vec<String>,
    pub auth_type: AuthType,
    pub auth_key: String,
    pub request_rate_ms: u64,
}
