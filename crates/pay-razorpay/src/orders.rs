//! # Razorpay Orders
//!
//! Implementation of the Razorpay Orders API (`/v1/orders`).
//! Orders carry the amount, currency and the checkout notes; payment itself happens
//! in Razorpay's client-side widget.

use crate::config::RazorpayConfig;
use async_trait::async_trait;
use pay_core::{
    GatewayOrder, GatewayOrderRequest, OrderNotes, PaymentError, PaymentGateway, PaymentResult,
};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "razorpay";

/// Razorpay gateway over the REST API, authenticated with HTTP basic auth
pub struct RazorpayGateway {
    config: RazorpayConfig,
    client: Client,
}

impl RazorpayGateway {
    /// Create a new Razorpay gateway
    pub fn new(config: RazorpayConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(RazorpayConfig::from_env()?)
    }

    pub fn config(&self) -> &RazorpayConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn read_order(response: Response) -> PaymentResult<GatewayOrder> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Razorpay API error: status={}, body={}", status, body);

            // Parse Razorpay error
            if let Ok(error_response) = serde_json::from_str::<RazorpayErrorResponse>(&body) {
                return Err(PaymentError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: error_response.error.description,
                });
            }

            return Err(PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let order: RazorpayOrderResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse Razorpay response: {}", e))
        })?;

        Ok(order.into())
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, request), fields(receipt = %request.receipt))]
    async fn create_order(&self, request: &GatewayOrderRequest) -> PaymentResult<GatewayOrder> {
        debug!(
            "Creating Razorpay order: amount={}, currency={}",
            request.amount, request.currency
        );

        let body = RazorpayOrderRequest {
            amount: request.amount,
            currency: request.currency.as_str(),
            receipt: &request.receipt,
            notes: &request.notes,
        };

        let response = self
            .client
            .post(self.url("/v1/orders"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let order = Self::read_order(response).await?;

        info!(
            "Created Razorpay order: id={}, amount={}",
            order.id, order.amount
        );

        Ok(order)
    }

    #[instrument(skip(self))]
    async fn fetch_order(&self, order_id: &str) -> PaymentResult<GatewayOrder> {
        let response = self
            .client
            .get(self.url(&format!("/v1/orders/{}", order_id)))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        Self::read_order(response).await
    }

    fn key_id(&self) -> &str {
        &self.config.key_id
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Razorpay API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct RazorpayOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: &'a OrderNotes,
}

#[derive(Debug, Deserialize)]
struct RazorpayOrderResponse {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
    #[serde(default)]
    status: Option<String>,
    /// An empty notes object comes back as `[]`
    #[serde(default)]
    notes: serde_json::Value,
}

impl From<RazorpayOrderResponse> for GatewayOrder {
    fn from(order: RazorpayOrderResponse) -> Self {
        GatewayOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt,
            status: order.status,
            notes: notes_from_value(&order.notes),
        }
    }
}

/// Read notes leniently: non-object notes are empty, scalar values are stringified.
fn notes_from_value(value: &serde_json::Value) -> OrderNotes {
    let Some(map) = value.as_object() else {
        return OrderNotes::default();
    };

    let field = |key: &str| match map.get(key) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    };

    OrderNotes {
        event_id: field("event_id"),
        customer_name: field("customer_name"),
        email: field("email"),
        mobile: field("mobile"),
        description: field("description"),
    }
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorResponse {
    error: RazorpayError,
}

#[derive(Debug, Deserialize)]
struct RazorpayError {
    #[serde(default)]
    #[allow(dead_code)]
    code: Option<String>,
    description: String,
}
