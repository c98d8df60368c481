//! Off-chain oracle orchestrator: one indexer loop per configured chain,
//! each fetching `RequestAdded` events, routing them through the
//! integration registry, and submitting `fulfil_request` back on chain.

use axum::{routing::get, Json, Router};
use oracle_adapters::{
    handlers, HandleModelAdapter, HttpProofVerifier, InMemoryEventStore, IntegrationRegistry,
    ObjectEventModelAdapter, PostgresEventStore, TxStreamModelAdapter,
};
use oracle_orchestrator::config::{self, ChainFamily, Config};
use oracle_orchestrator::indexer::IndexerTick;
use oracle_ports::{ChainAdapter, EventStore, ProofVerifier};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

struct AppState {
    chain_ready: HashMap<String, AtomicBool>,
}

impl AppState {
    fn is_ready(&self) -> bool {
        self.chain_ready.values().all(|r| r.load(Ordering::Relaxed))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not initialised yet on a config failure; this is
            // the one place in the process a plain eprintln is correct.
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(chains = config.chains.len(), "starting oracle orchestrator");

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let postgres = match PostgresEventStore::connect(&config.database_url).await {
        Ok(pg) => {
            pg.ensure_schema().await?;
            info!("connected to Postgres event store");
            Some(pg)
        }
        Err(e) => {
            warn!(error = %e, "falling back to in-memory event store");
            None
        }
    };
    let store: Arc<dyn EventStore> = match &postgres {
        Some(pg) => Arc::new(PostgresEventStore::new(pg.pool().clone())),
        None => Arc::new(InMemoryEventStore::new()),
    };

    let mut registry = IntegrationRegistry::new(http_client.clone());
    if let Some(token) = &config.handler_credentials.openai_token {
        registry.register(handlers::openai_handler_spec(token.clone(), Vec::new()));
    }
    match &config.handler_credentials.twitter_bearer_token {
        Some(token) => {
            registry.register(handlers::twitter_handler_spec_with_bearer(token.clone()));
        }
        None => {
            registry.register(handlers::twitter_handler_spec());
        }
    }

    if let Some(pg) = &postgres {
        if let Ok(rows) = pg.load_supported_urls().await {
            for row in rows {
                registry.register_supported_url(row);
            }
        }
    }

    let mut oauth2_credentials = HashMap::new();
    if config.handler_credentials.twitter_bearer_token.is_none() {
        if let (Some(client_id), Some(client_secret), Some(token_url)) = (
            &config.handler_credentials.twitter_client_id,
            &config.handler_credentials.twitter_client_secret,
            &config.handler_credentials.twitter_token_url,
        ) {
            oauth2_credentials.insert(
                "twitter".to_string(),
                (token_url.clone(), client_id.clone(), client_secret.clone()),
            );
        }
    }
    registry.bootstrap_credentials(&oauth2_credentials).await;

    let registry = Arc::new(registry);

    let proof_verifier: Option<Arc<dyn ProofVerifier>> = config
        .proof
        .as_ref()
        .map(|proof| Arc::new(HttpProofVerifier::new(proof.verity_prover_url.clone(), http_client.clone())) as Arc<dyn ProofVerifier>);

    let mut chain_ready = HashMap::new();
    let mut ticks = Vec::new();

    for chain in &config.chains {
        let private_key = load_private_key(&postgres, chain).await;
        let adapter = build_chain_adapter(chain, &private_key, http_client.clone())?;
        chain_ready.insert(chain.chain_id.clone(), AtomicBool::new(false));

        let tick = Arc::new(IndexerTick::new(
            adapter,
            store.clone(),
            registry.clone(),
            proof_verifier.clone(),
            config.batch_size,
        ));
        ticks.push((chain.clone(), tick));
    }

    let state = Arc::new(AppState { chain_ready });

    let mut handles = Vec::new();
    for (chain_config, tick) in ticks {
        let state = state.clone();
        handles.push(tokio::spawn(run_chain_loop(chain_config, tick, state)));
    }

    let health_addr = SocketAddr::from(([0, 0, 0, 0], config.health_port));
    let health_state = state.clone();
    let health_app = Router::new()
        .route("/healthz", get(|| async { Json(json!({"status": "ok"})) }))
        .route(
            "/readyz",
            get(move || ready_handler(health_state.clone())),
        );

    let health_server = tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(health_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, "failed to bind health server");
                return;
            }
        };
        info!(addr = %health_addr, "health server listening");
        if let Err(e) = axum::serve(listener, health_app).await {
            error!(error = %e, "health server error");
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    for handle in handles {
        handle.abort();
    }
    health_server.abort();
    Ok(())
}

async fn ready_handler(state: Arc<AppState>) -> Json<serde_json::Value> {
    Json(json!({"status": if state.is_ready() { "ready" } else { "not_ready" }}))
}

/// The `Keeper` table takes priority when it already has a row for this
/// `(chain, module)`; a fresh deployment falls back to the environment key
/// until custody is migrated into the database.
async fn load_private_key(postgres: &Option<PostgresEventStore>, chain: &config::ChainConfig) -> String {
    if let Some(pg) = postgres {
        match pg.load_keeper(&chain.chain_id, "oracles").await {
            Ok(Some(keeper)) => return keeper.private_key_hex,
            Ok(None) => {}
            Err(e) => warn!(chain = %chain.chain_id, error = %e, "failed to load keeper row, falling back to env key"),
        }
    }
    chain.private_key.clone()
}

fn build_chain_adapter(
    chain: &config::ChainConfig,
    private_key: &str,
    http_client: reqwest::Client,
) -> Result<Box<dyn ChainAdapter>, Box<dyn std::error::Error>> {
    let adapter: Box<dyn ChainAdapter> = match chain.family {
        ChainFamily::Rooch => Box::new(HandleModelAdapter::new(
            chain.chain_id.clone(),
            "oracles",
            chain.rpc_url.clone(),
            private_key,
            http_client,
        )?),
        ChainFamily::Aptos => Box::new(TxStreamModelAdapter::new(
            chain.chain_id.clone(),
            "oracles",
            chain.rpc_url.clone(),
            chain.rpc_url.clone(),
            private_key,
            http_client,
        )?),
        ChainFamily::Sui => Box::new(ObjectEventModelAdapter::new(
            chain.chain_id.clone(),
            chain.oracle_address.clone(),
            "oracles",
            chain.rpc_url.clone(),
            private_key,
            http_client,
        )?),
    };
    Ok(adapter)
}

async fn run_chain_loop(chain: config::ChainConfig, tick: Arc<IndexerTick>, state: Arc<AppState>) {
    let schedule = match cron::Schedule::from_str(&chain.indexer_cron) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!(chain = %chain.chain_id, error = %e, "invalid cron schedule, loop will not run");
            return;
        }
    };

    info!(chain = %chain.chain_id, cron = %chain.indexer_cron, "indexer loop started");

    loop {
        let now = chrono::Utc::now();
        let Some(next) = schedule.after(&now).next() else {
            error!(chain = %chain.chain_id, "cron schedule produced no further occurrences");
            return;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::from_secs(1));
        tokio::time::sleep(wait).await;

        if tick.run_if_idle().await {
            if let Some(ready) = state.chain_ready.get(&chain.chain_id) {
                ready.store(true, Ordering::Relaxed);
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
