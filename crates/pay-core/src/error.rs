//! # Payment Error Types
//!
//! Typed error handling for the event-checkout engine.
//! All checkout, store and gateway operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all checkout operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing or malformed request fields
    #[error("{0}")]
    InvalidInput(String),

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Data is present but cannot be acted on (non-positive amount, missing gateway notes)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Authentication or authorization failure
    #[error("{0}")]
    Unauthorized(String),

    /// Unique key already taken
    #[error("{0}")]
    Conflict(String),

    /// Payment gateway rejected the call
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with the gateway
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Relational store failure
    #[error("Database error: {0}")]
    Database(String),

    /// Email delivery failure
    #[error("Notification error: {0}")]
    Notification(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// Shorthand for a missing entity
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        PaymentError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidInput(_) => 400,
            PaymentError::NotFound { .. } => 404,
            PaymentError::InvalidState(_) => 422,
            PaymentError::Unauthorized(_) => 401,
            PaymentError::Conflict(_) => 409,
            PaymentError::ProviderError { .. } => 502,
            PaymentError::NetworkError(_) => 503,
            PaymentError::Database(_) => 500,
            PaymentError::Notification(_) => 500,
            PaymentError::Serialization(_) => 500,
            PaymentError::Internal(_) => 500,
        }
    }

    /// True for system-side failures whose detail must not reach the caller
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }

    /// Message safe to hand back to an API client
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Result type alias for checkout operations
pub type PaymentResult<T> = Result<T, PaymentError>;
