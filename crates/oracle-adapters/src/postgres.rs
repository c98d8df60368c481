//! PostgreSQL adapter implementations
//!
//! Implements the `Events` table as the durable idempotence log, plus
//! loaders for the `Keeper` and `SupportedUrl` tables consumed at startup
//! by the orchestrator and the integration registry.

use async_trait::async_trait;
use oracle_domain::{AuthType, EventRowStatus, Keeper, NewEventRow, SupportedUrl};
use oracle_ports::{EventStore, EventStoreError};
use sqlx::{PgPool, Row};
use tracing::{debug, error, instrument};

/// PostgreSQL-backed event store.
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, EventStoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| EventStoreError::Connection {
                message: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not already exist. The uniqueness
    /// constraint on `events` is what makes `record_attempt` idempotent at
    /// the database level, independent of any in-process check.
    pub async fn ensure_schema(&self) -> Result<(), EventStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id BIGSERIAL PRIMARY KEY,
                chain TEXT NOT NULL,
                oracle_address TEXT NOT NULL,
                event_handle_id TEXT NOT NULL,
                event_seq BIGINT NOT NULL,
                event_index BIGINT NOT NULL,
                event_type TEXT NOT NULL,
                event_data TEXT NOT NULL,
                decoded_event_data TEXT NOT NULL,
                status TEXT NOT NULL,
                retries INT NOT NULL DEFAULT 0,
                response TEXT NOT NULL,
                indexed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (chain, oracle_address, event_handle_id, event_seq)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::Connection {
            message: e.to_string(),
        })?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS events_cursor_idx
                ON events (chain, oracle_address, event_seq DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::Connection {
            message: e.to_string(),
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS keeper (
                chain TEXT NOT NULL,
                module TEXT NOT NULL,
                private_key TEXT NOT NULL,
                PRIMARY KEY (chain, module)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::Connection {
            message: e.to_string(),
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS supported_url (
                domain TEXT PRIMARY KEY,
                supported_paths TEXT[] NOT NULL,
                auth_type TEXT NOT NULL,
                auth_key TEXT NOT NULL,
                request_rate_ms BIGINT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::Connection {
            message: e.to_string(),
        })?;

        Ok(())
    }

    /// Load the keeper row for `(chain, module)`, if one has been persisted.
    #[instrument(skip(self))]
    pub async fn load_keeper(
        &self,
        chain: &str,
        module: &str,
    ) -> Result<Option<Keeper>, EventStoreError> {
        let row = sqlx::query(
            "SELECT chain, module, private_key FROM keeper WHERE chain = $1 AND module = $2",
        )
        .bind(chain)
        .bind(module)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EventStoreError::Connection {
            message: e.to_string(),
        })?;

        Ok(row.map(|row| Keeper {
            chain: row.get("chain"),
            module: row.get("module"),
            private_key_hex: row.get("private_key"),
        }))
    }

    /// Load all dynamically-configured handler rows.
    #[instrument(skip(self))]
    pub async fn load_supported_urls(&self) -> Result<Vec<SupportedUrl>, EventStoreError> {
        let rows = sqlx::query(
            "SELECT domain, supported_paths, auth_type, auth_key, request_rate_ms FROM supported_url",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EventStoreError::Connection {
            message: e.to_string(),
        })?;

        rows.into_iter()
            .map(|row| {
                let auth_type_str: String = row.get("auth_type");
                let auth_type = match auth_type_str.as_str() {
                    "BEARER" => AuthType::Bearer,
                    "OAUTH1" => AuthType::Oauth1,
                    "OAUTH2" => AuthType::Oauth2,
                    other => {
                        return Err(EventStoreError::Serialization {
                            message: format!("unknown auth_type {other:?} in supported_url"),
                        })
                    }
                };
                Ok(SupportedUrl {
                    domain: row.get("domain"),
                    supported_paths: row.get("supported_paths"),
                    auth_type,
                    auth_key: row.get("auth_key"),
                    request_rate_ms: row.get::<i64, _>("request_rate_ms") as u64,
                })
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    /// The highest recorded cursor for `(chain, oracle)`.
    #[instrument(skip(self), fields(chain = %chain, oracle = %oracle))]
    async fn latest_cursor(
        &self,
        chain: &str,
        oracle: &str,
    ) -> Result<Option<u64>, EventStoreError> {
        let row = sqlx::query(
            "SELECT MAX(event_seq) AS max_seq FROM events WHERE chain = $1 AND oracle_address = $2",
        )
        .bind(chain)
        .bind(oracle)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EventStoreError::Connection {
            message: e.to_string(),
        })?;

        let max_seq: Option<i64> = row.get("max_seq");
        Ok(max_seq.map(|s| s as u64))
    }

    /// Insert-or-ignore on the idempotence key.
    #[instrument(skip(self, row), fields(
        chain = %row.chain,
        event_seq = row.event_seq,
        status = ?row.status,
    ))]
    async fn record_attempt(&self, row: NewEventRow) -> Result<(), EventStoreError> {
        let status_str = match row.status {
            EventRowStatus::Success => "SUCCESS",
            EventRowStatus::Failed => "FAILED",
        };

        let result = sqlx::query(
            r#"
            INSERT INTO events (
                chain, oracle_address, event_handle_id, event_seq, event_index,
                event_type, event_data, decoded_event_data, status, response
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (chain, oracle_address, event_handle_id, event_seq) DO NOTHING
            "#,
        )
        .bind(&row.chain)
        .bind(&row.oracle_address)
        .bind(&row.event_handle_id)
        .bind(row.event_seq as i64)
        .bind(row.event_index as i64)
        .bind(&row.event_type)
        .bind(&row.event_data)
        .bind(&row.decoded_event_data)
        .bind(status_str)
        .bind(&row.response)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to record event attempt");
            EventStoreError::Connection {
                message: e.to_string(),
            }
        })?;

        if result.rows_affected() == 0 {
            debug!("duplicate idempotence key, attempt already recorded");
        }

        Ok(())
    }
}
