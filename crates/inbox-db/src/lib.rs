//! Postgres access for the webhook interaction log.
//!
//! [`Database`] owns a connection pool built from [`DatabaseConfig`]. It is
//! created once by the hosting process and handed to whoever needs it; the
//! pool connects lazily and is capped at `max_connections`, so concurrent
//! callers queue for a connection instead of opening new ones.

mod interactions;

pub use interactions::PostgresInteractionRepository;

use inbox_core::config::{DatabaseConfig, SslMode};
use inbox_core::error::{InboxError, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    /// Build the pool. No connection is opened until the first query.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let url = config.url().ok_or(InboxError::DatabaseUnconfigured)?;
        let options = PgConnectOptions::from_str(url)
            .map_err(|e| InboxError::Config(format!("invalid database url: {e}")))?
            .ssl_mode(pg_ssl_mode(config.ssl_mode));

        let max_connections = config.max_connections.max(1);
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy_with(options);

        tracing::info!(
            "Postgres pool configured for {} (max {} connections)",
            redact_url(url),
            max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Repository over `instagram_webhook_analytics` and the LLM trace tables.
    pub fn interactions(&self) -> PostgresInteractionRepository {
        PostgresInteractionRepository::new(self.pool.clone())
    }

    /// Wait for checked-out connections to return, then close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Postgres pool closed");
    }
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

/// Connection string with the password masked, for logs.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                // Only fails for cannot-be-a-base URLs, which carry no password.
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable database url>".to_string(),
    }
}

pub(crate) fn query_error(err: sqlx::Error) -> InboxError {
    InboxError::Query(err.to_string())
}
