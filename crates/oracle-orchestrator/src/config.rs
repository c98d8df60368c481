//! Environment-driven startup configuration, validated once before any
//! chain loop or HTTP listener starts.

use cron::Schedule;
use regex::Regex;
use std::str::FromStr;
use thiserror::Error;

const ADDRESS_PATTERN: &str = r"^0x[0-9a-fA-F]{64}$";
const DEFAULT_CRON: &str = "*/5 * * * * *";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is required")]
    MissingVar { var: String },

    #[error("{var} is not valid: {reason}")]
    InvalidVar { var: String, reason: String },

    #[error("unsupported chain family {0:?} in CHAINS")]
    UnknownFamily(String),
}

/// Which of the three cursor models a configured chain uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFamily {
    Rooch,
    Aptos,
    Sui,
}

impl ChainFamily {
    fn env_prefix(self) -> &'static str {
        match self {
            ChainFamily::Rooch => "ROOCH",
            ChainFamily::Aptos => "APTOS",
            ChainFamily::Sui => "SUI",
        }
    }
}

impl FromStr for ChainFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ROOCH" => Ok(ChainFamily::Rooch),
            "APTOS" => Ok(ChainFamily::Aptos),
            "SUI" => Ok(ChainFamily::Sui),
            other => Err(ConfigError::UnknownFamily(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub family: ChainFamily,
    pub chain_id: String,
    pub private_key: String,
    pub oracle_address: String,
    pub indexer_cron: String,
    pub rpc_url: String,
}

#[derive(Debug, Clone)]
pub struct HandlerCredentials {
    /// A fixed bearer token for the Twitter-style handler. Takes priority
    /// over the OAuth2 client-credentials fields below when set.
    pub twitter_bearer_token: Option<String>,
    pub twitter_client_id: Option<String>,
    pub twitter_client_secret: Option<String>,
    pub twitter_token_url: Option<String>,
    pub openai_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProofConfig {
    pub verity_prover_url: String,
    pub ic_canister_id: Option<String>,
    pub ic_seed: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub chains: Vec<ChainConfig>,
    pub batch_size: usize,
    pub http_timeout_secs: u64,
    pub health_port: u16,
    pub database_url: String,
    pub handler_credentials: HandlerCredentials,
    pub proof: Option<ProofConfig>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let chains_var = require_var("CHAINS")?;
        let mut chains = Vec::new();
        for family_name in chains_var.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let family = ChainFamily::from_str(family_name)?;
            chains.push(load_chain_config(family)?);
        }

        let batch_size = optional_var("BATCH_SIZE")
            .map(|v| parse_numeric("BATCH_SIZE", &v))
            .transpose()?
            .unwrap_or(1000);
        let http_timeout_secs = optional_var("HTTP_TIMEOUT_SECS")
            .map(|v| parse_numeric("HTTP_TIMEOUT_SECS", &v))
            .transpose()?
            .unwrap_or(40);
        let health_port = optional_var("HEALTH_PORT")
            .map(|v| parse_numeric("HEALTH_PORT", &v))
            .transpose()?
            .unwrap_or(8081);
        let database_url = require_var("DATABASE_URL")?;

        let handler_credentials = HandlerCredentials {
            twitter_bearer_token: optional_var("X_BEARER_TOKEN"),
            twitter_client_id: optional_var("X_CLIENT_ID"),
            twitter_client_secret: optional_var("X_CLIENT_SECRET"),
            twitter_token_url: optional_var("X_TOKEN_URL"),
            openai_token: optional_var("OPENAI_TOKEN"),
        };

        let proof = optional_var("VERITY_PROVER_URL").map(|verity_prover_url| ProofConfig {
            verity_prover_url,
            ic_canister_id: optional_var("IC_CANISTER_ID"),
            ic_seed: optional_var("IC_SEED"),
        });

        let log_level = std::env::var("RUST_LOG")
            .or_else(|_| std::env::var("LOG_LEVEL"))
            .unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            chains,
            batch_size,
            http_timeout_secs,
            health_port,
            database_url,
            handler_credentials,
            proof,
            log_level,
        })
    }
}

fn load_chain_config(family: ChainFamily) -> Result<ChainConfig, ConfigError> {
    let prefix = family.env_prefix();
    let chain_id = require_var(&format!("{prefix}_CHAIN_ID"))?;
    let private_key = require_var(&format!("{prefix}_PRIVATE_KEY"))?;
    if private_key.trim_start_matches("0x").is_empty()
        || hex::decode(private_key.trim_start_matches("0x")).is_err()
    {
        return Err(ConfigError::InvalidVar {
            var: format!("{prefix}_PRIVATE_KEY"),
            reason: "must be non-empty hex".to_string(),
        });
    }

    let oracle_address = require_var(&format!("{prefix}_ORACLE_ADDRESS"))?;
    let address_re = Regex::new(ADDRESS_PATTERN).expect("static regex is valid");
    if !address_re.is_match(&oracle_address) {
        return Err(ConfigError::InvalidVar {
            var: format!("{prefix}_ORACLE_ADDRESS"),
            reason: "must match ^0x[0-9a-fA-F]{64}$".to_string(),
        });
    }

    let indexer_cron =
        optional_var(&format!("{prefix}_INDEXER_CRON")).unwrap_or_else(|| DEFAULT_CRON.to_string());
    if Schedule::from_str(&indexer_cron).is_err() {
        return Err(ConfigError::InvalidVar {
            var: format!("{prefix}_INDEXER_CRON"),
            reason: "must be a valid cron expression".to_string(),
        });
    }

    let rpc_url = require_var(&format!("{prefix}_RPC_URL"))?;

    Ok(ChainConfig {
        family,
        chain_id,
        private_key,
        oracle_address,
        indexer_cron,
        rpc_url,
    })
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar {
        var: name.to_string(),
    })
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_numeric<T: FromStr>(var: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidVar {
        var: var.to_string(),
        reason: format!("{raw:?} is not a valid number"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialise tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_chain_vars(prefix: &str) {
        for suffix in ["CHAIN_ID", "PRIVATE_KEY", "ORACLE_ADDRESS", "INDEXER_CRON", "RPC_URL"] {
            std::env::remove_var(format!("{prefix}_{suffix}"));
        }
    }

    #[test]
    fn chain_family_parses_case_insensitively() {
        assert_eq!(ChainFamily::from_str("rooch").unwrap(), ChainFamily::Rooch);
        assert_eq!(ChainFamily::from_str("APTOS").unwrap(), ChainFamily::Aptos);
        assert!(ChainFamily::from_str("ETHEREUM").is_err());
    }

    #[test]
    fn missing_chains_var_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("CHAINS");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar { .. }));
    }

    #[test]
    fn invalid_oracle_address_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_chain_vars("ROOCH");
        std::env::set_var("CHAINS", "ROOCH");
        std::env::set_var("ROOCH_CHAIN_ID", "ROOCH-testnet");
        std::env::set_var("ROOCH_PRIVATE_KEY", "aa".repeat(32));
        std::env::set_var("ROOCH_ORACLE_ADDRESS", "not-an-address");
        std::env::set_var("ROOCH_RPC_URL", "https://rooch.example.com");
        std::env::set_var("DATABASE_URL", "postgres://localhost/test");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { var, .. } if var == "ROOCH_ORACLE_ADDRESS"));

        std::env::remove_var("CHAINS");
        clear_chain_vars("ROOCH");
        std::env::remove_var("DATABASE_URL");
    }

    #[test]
    fn valid_single_chain_config_loads() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_chain_vars("APTOS");
        std::env::set_var("CHAINS", "APTOS");
        std::env::set_var("APTOS_CHAIN_ID", "APTOS-MAINNET");
        std::env::set_var("APTOS_PRIVATE_KEY", "bb".repeat(32));
        std::env::set_var("APTOS_ORACLE_ADDRESS", format!("0x{}", "cc".repeat(32)));
        std::env::set_var("APTOS_RPC_URL", "https://aptos.example.com");
        std::env::set_var("DATABASE_URL", "postgres://localhost/test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.chains.len(), 1);
        assert_eq!(config.chains[0].family, ChainFamily::Aptos);
        assert_eq!(config.chains[0].indexer_cron, DEFAULT_CRON);
        assert_eq!(config.batch_size, 1000);

        std::env::remove_var("CHAINS");
        clear_chain_vars("APTOS");
        std::env::remove_var("DATABASE_URL");
    }
}
