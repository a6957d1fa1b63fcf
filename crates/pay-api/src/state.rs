//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the checkout, catalog and account services plus the HTTP configuration.

use crate::auth::{AccountService, JwtKeys};
use pay_core::{
    BoxedAccountStore, BoxedEventStore, BoxedNotifier, BoxedPaymentGateway, BoxedPurchaseStore,
    CheckoutService, EventCatalog, PaymentError, PaymentResult,
};
use pay_razorpay::RazorpayGateway;
use pay_store::{PgStore, StoreConfig};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// CORS allow-list; empty means permissive
    pub allowed_origins: Vec<String>,
    /// Lower-cased emails allowed to create events and see reports
    pub admin_emails: Vec<String>,
    pub jwt_secret: String,
    /// Token lifetime; tokens carry no `exp` when unset
    pub jwt_ttl_minutes: Option<u64>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("allowed_origins", &self.allowed_origins)
            .field("admin_emails", &self.admin_emails)
            .field("jwt_secret", &"***")
            .field("jwt_ttl_minutes", &self.jwt_ttl_minutes)
            .finish()
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// Load from environment variables. `JWT_SECRET` is required.
    pub fn from_env() -> PaymentResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PaymentResult<Self> {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                PaymentError::Configuration(format!("PORT must be a valid port number: {}", raw))
            })?,
            None => 8080,
        };

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PaymentError::Configuration("JWT_SECRET not set".to_string()))?;

        let jwt_ttl_minutes = match lookup("JWT_TTL_MINUTES").filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(raw.trim().parse::<u64>().ok().filter(|m| *m > 0).ok_or_else(
                || {
                    PaymentError::Configuration(format!(
                        "JWT_TTL_MINUTES must be a positive integer: {}",
                        raw
                    ))
                },
            )?),
            None => None,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            allowed_origins: split_list(lookup("ALLOWED_ORIGINS")),
            admin_emails: split_list(lookup("ADMIN_EMAILS"))
                .into_iter()
                .map(|email| email.to_lowercase())
                .collect(),
            jwt_secret,
            jwt_ttl_minutes,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> PaymentResult<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|e| {
            PaymentError::Configuration(format!(
                "Invalid socket address {}:{}: {}",
                self.host, self.port, e
            ))
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }

    pub fn jwt_keys(&self) -> JwtKeys {
        JwtKeys::new(
            &self.jwt_secret,
            self.jwt_ttl_minutes.map(|m| Duration::from_secs(m * 60)),
        )
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<CheckoutService>,
    pub catalog: Arc<EventCatalog>,
    pub accounts: Arc<AccountService>,
    pub jwt: JwtKeys,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Connect to Postgres, run migrations and wire the Razorpay gateway and notifier
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store_config = StoreConfig::from_env()?;
        let pool = store_config.connect().await?;
        let store = Arc::new(PgStore::new(pool));
        store.migrate().await?;
        info!("Database migrations applied");

        let gateway = RazorpayGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Razorpay: {}", e))?;
        let key_secret = gateway.config().key_secret.clone();
        info!(
            key_id = %gateway.config().key_id,
            live = gateway.config().is_live_mode(),
            "Razorpay gateway ready"
        );

        let notifier = pay_notify::notifier_from_env()?;

        Ok(Self::from_parts(
            config,
            store.clone(),
            store.clone(),
            store,
            Arc::new(gateway),
            notifier,
            key_secret,
        ))
    }

    /// Assemble state from already-built collaborators
    pub fn from_parts(
        config: AppConfig,
        events: BoxedEventStore,
        purchases: BoxedPurchaseStore,
        accounts: BoxedAccountStore,
        gateway: BoxedPaymentGateway,
        notifier: BoxedNotifier,
        key_secret: impl Into<String>,
    ) -> Self {
        let jwt = config.jwt_keys();
        let checkout = CheckoutService::new(events.clone(), purchases, gateway, notifier, key_secret);

        Self {
            checkout: Arc::new(checkout),
            catalog: Arc::new(EventCatalog::new(events)),
            accounts: Arc::new(AccountService::new(accounts, jwt.clone())),
            jwt,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> PaymentResult<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_app_config_defaults() {
        let config = config_from(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.allowed_origins.is_empty());
        assert!(config.admin_emails.is_empty());
        assert_eq!(config.jwt_ttl_minutes, None);
        assert!(!config.is_production());
    }

    #[test]
    fn test_requires_jwt_secret() {
        assert!(matches!(
            config_from(&[]),
            Err(PaymentError::Configuration(_))
        ));
        assert!(config_from(&[("JWT_SECRET", "s"), ("PORT", "http")]).is_err());
        assert!(config_from(&[("JWT_SECRET", "s"), ("JWT_TTL_MINUTES", "0")]).is_err());
    }

    #[test]
    fn test_lists_and_admins() {
        let config = config_from(&[
            ("JWT_SECRET", "s3cret"),
            ("ALLOWED_ORIGINS", "https://a.example.com, https://b.example.com,"),
            ("ADMIN_EMAILS", "Admin@Example.com ,ops@example.com"),
            ("JWT_TTL_MINUTES", "90"),
        ])
        .unwrap();

        assert_eq!(config.allowed_origins.len(), 2);
        assert!(config.is_admin("admin@example.com"));
        assert!(config.is_admin(" OPS@example.com"));
        assert!(!config.is_admin("someone@example.com"));
        assert_eq!(config.jwt_ttl_minutes, Some(90));
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    fn test_socket_addr() {
        let mut config = config_from(&[("JWT_SECRET", "s"), ("PORT", "3000")]).unwrap();
        config.host = "0.0.0.0".to_string();
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");

        config.host = "not a host".to_string();
        assert!(config.socket_addr().is_err());
    }
}
