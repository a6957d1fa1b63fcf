//! # Store Configuration
//!
//! Connection settings for the PostgreSQL pool, loaded from the environment.

use pay_core::{PaymentError, PaymentResult};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::env;
use std::time::Duration;
use tracing::info;

const DEFAULT_POOL_MAX: u32 = 20;
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub idle_timeout: Duration,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("database_url", &"***")
            .field("max_connections", &self.max_connections)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Required: `DATABASE_URL`. Optional: `PG_POOL_MAX` (default 20),
    /// `PG_IDLE_TIMEOUT_MS` (default 30000).
    pub fn from_env() -> PaymentResult<Self> {
        dotenvy::dotenv().ok();

        Self::from_vars(
            env::var("DATABASE_URL").ok(),
            env::var("PG_POOL_MAX").ok(),
            env::var("PG_IDLE_TIMEOUT_MS").ok(),
        )
    }

    fn from_vars(
        database_url: Option<String>,
        pool_max: Option<String>,
        idle_timeout_ms: Option<String>,
    ) -> PaymentResult<Self> {
        let database_url = database_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PaymentError::Configuration("DATABASE_URL not set".to_string()))?;

        let max_connections = match pool_max {
            Some(raw) => raw.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                PaymentError::Configuration(format!("PG_POOL_MAX must be a positive integer: {}", raw))
            })?,
            None => DEFAULT_POOL_MAX,
        };

        let idle_timeout_ms = match idle_timeout_ms {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                PaymentError::Configuration(format!("PG_IDLE_TIMEOUT_MS must be an integer: {}", raw))
            })?,
            None => DEFAULT_IDLE_TIMEOUT_MS,
        };

        Ok(Self {
            database_url,
            max_connections,
            idle_timeout: Duration::from_millis(idle_timeout_ms),
        })
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_POOL_MAX,
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
        }
    }

    /// Open the pool.
    pub async fn connect(&self) -> PaymentResult<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .idle_timeout(self.idle_timeout)
            .connect(&self.database_url)
            .await
            .map_err(|e| PaymentError::Database(format!("Failed to connect: {}", e)))?;

        info!(
            max_connections = self.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(pool)
    }
}
