//! # Payment Gateway Trait
//!
//! Boundary to the third-party gateway that owns order state.
//! Implementations: Razorpay (pay-razorpay), stubs for tests.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentGateway (trait)                   │
//! │  ├── create_order()                                         │
//! │  ├── fetch_order()                                          │
//! │  ├── key_id()                                               │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gateway's signing secret never crosses this trait; it is handed to the
//! checkout service separately and only used for HMAC verification.

use crate::customer::NewCustomer;
use crate::error::{PaymentError, PaymentResult};
use crate::money::Currency;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Business context stashed on a gateway order at creation time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Notes after the required keys were checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub event_id: Uuid,
    pub customer: NewCustomer,
    pub description: Option<String>,
}

impl OrderNotes {
    /// Recover the checkout details from the notes.
    ///
    /// Missing customer name/email/mobile or event id means the order was not created
    /// by this service or was tampered with; fails with `InvalidState`.
    pub fn checkout_details(&self) -> PaymentResult<CheckoutDetails> {
        fn required<'a>(value: &'a Option<String>, key: &str) -> PaymentResult<&'a str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    PaymentError::InvalidState(format!("gateway order notes missing {}", key))
                })
        }

        let event_id = required(&self.event_id, "event_id")?;
        let customer = NewCustomer {
            name: required(&self.customer_name, "customer_name")?.to_string(),
            email: required(&self.email, "email")?.to_string(),
            mobile: required(&self.mobile, "mobile")?.to_string(),
        };
        let event_id = Uuid::parse_str(event_id).map_err(|e| {
            PaymentError::InvalidState(format!("gateway order notes carry a bad event_id: {}", e))
        })?;

        Ok(CheckoutDetails {
            event_id,
            customer,
            description: self.description.clone().filter(|d| !d.trim().is_empty()),
        })
    }
}

/// Order creation request sent to the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrderRequest {
    /// Amount in minor units
    pub amount: i64,
    pub currency: Currency,
    /// Advisory receipt token (uniqueness not guaranteed)
    pub receipt: String,
    pub notes: OrderNotes,
}

/// An order as the gateway reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: OrderNotes,
}

/// Core trait for payment gateway implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order the client-side widget can pay against.
    async fn create_order(&self, request: &GatewayOrderRequest) -> PaymentResult<GatewayOrder>;

    /// Fetch an order by the gateway's id.
    async fn fetch_order(&self, order_id: &str) -> PaymentResult<GatewayOrder>;

    /// Public key id handed to the client widget.
    fn key_id(&self) -> &str;

    /// Provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
