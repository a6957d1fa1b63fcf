//! # Razorpay Configuration
//!
//! Configuration management for the Razorpay integration.
//! All secrets are loaded from environment variables.

use pay_core::PaymentError;
use std::env;

const DEFAULT_API_BASE_URL: &str = "https://api.razorpay.com";

/// Razorpay API configuration
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Public key id (rzp_test_... or rzp_live_...), handed to the checkout widget
    pub key_id: String,

    /// Key secret: basic-auth password and payment signature key
    pub key_secret: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"***")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl RazorpayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `RAZORPAY_KEY_ID`
    /// - `RAZORPAY_KEY_SECRET`
    ///
    /// Optional: `RAZORPAY_API_BASE_URL`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let key_id = env::var("RAZORPAY_KEY_ID")
            .map_err(|_| PaymentError::Configuration("RAZORPAY_KEY_ID not set".to_string()))?;

        let key_secret = env::var("RAZORPAY_KEY_SECRET").map_err(|_| {
            PaymentError::Configuration("RAZORPAY_KEY_SECRET not set".to_string())
        })?;

        let config = Self::new(key_id, key_secret);
        config.validate()?;

        match env::var("RAZORPAY_API_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Ok(config.with_api_base_url(url.trim())),
            _ => Ok(config),
        }
    }

    /// Create config with explicit values (for testing)
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Check key formats
    pub fn validate(&self) -> Result<(), PaymentError> {
        if !self.key_id.starts_with("rzp_test_") && !self.key_id.starts_with("rzp_live_") {
            return Err(PaymentError::Configuration(
                "RAZORPAY_KEY_ID must start with rzp_test_ or rzp_live_".to_string(),
            ));
        }

        if self.key_secret.trim().is_empty() {
            return Err(PaymentError::Configuration(
                "RAZORPAY_KEY_SECRET is empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.key_id.starts_with("rzp_test_")
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.key_id.starts_with("rzp_live_")
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_modes() {
        let config = RazorpayConfig::new("rzp_test_abc123", "secret");
        assert!(config.validate().is_ok());
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());

        let config = RazorpayConfig::new("rzp_live_abc123", "secret");
        assert!(config.validate().is_ok());
        assert!(config.is_live_mode());
    }

    #[test]
    fn test_rejects_malformed_keys() {
        let config = RazorpayConfig::new("sk_test_abc123", "secret");
        assert!(matches!(
            config.validate(),
            Err(PaymentError::Configuration(_))
        ));

        let config = RazorpayConfig::new("rzp_test_abc123", "  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = RazorpayConfig::new("rzp_test_abc123", "very_secret_value");
        let printed = format!("{:?}", config);
        assert!(printed.contains("rzp_test_abc123"));
        assert!(!printed.contains("very_secret_value"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config =
            RazorpayConfig::new("rzp_test_abc123", "secret").with_api_base_url("http://localhost:9090/");
        assert_eq!(config.api_base_url, "http://localhost:9090");
    }

    #[test]
    fn test_from_env_missing_key() {
        // Clear any existing env vars
        env::remove_var("RAZORPAY_KEY_ID");

        let result = RazorpayConfig::from_env();
        assert!(result.is_err());
    }
}
