//! # Purchase Types
//!
//! One purchase row per checkout attempt, keyed by the gateway order id.
//!
//! ```text
//! attempted --(signature valid)---> paid
//! attempted --(signature invalid)-> failed
//! ```

use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Status of a purchase row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Gateway order exists, no attempt recorded yet
    Created,
    /// Customer was handed the payment widget
    Attempted,
    /// Signature verified
    Paid,
    /// Signature mismatch
    Failed,
    /// Reporting only; no transition into it is modeled
    Refunded,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Created => "created",
            PurchaseStatus::Attempted => "attempted",
            PurchaseStatus::Paid => "paid",
            PurchaseStatus::Failed => "failed",
            PurchaseStatus::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseStatus::Paid | PurchaseStatus::Failed | PurchaseStatus::Refunded
        )
    }

    /// Status after a verification callback.
    ///
    /// A paid row never moves. A valid signature settles any other row, including a
    /// failed one (the gateway allows another payment on the same order).
    pub fn after_verification(self, signature_valid: bool) -> Self {
        match (self, signature_valid) {
            (PurchaseStatus::Paid, _) => PurchaseStatus::Paid,
            (PurchaseStatus::Refunded, _) => PurchaseStatus::Refunded,
            (_, true) => PurchaseStatus::Paid,
            (_, false) => PurchaseStatus::Failed,
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(PurchaseStatus::Created),
            "attempted" => Ok(PurchaseStatus::Attempted),
            "paid" => Ok(PurchaseStatus::Paid),
            "failed" => Ok(PurchaseStatus::Failed),
            "refunded" => Ok(PurchaseStatus::Refunded),
            other => Err(PaymentError::Serialization(format!(
                "unknown purchase status: {}",
                other
            ))),
        }
    }
}

/// A purchase row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub event_id: Uuid,
    pub customer_id: Uuid,

    /// Amount in minor units
    pub amount: i64,

    pub currency: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: PurchaseStatus,

    /// Gateway order id (unique)
    pub razorpay_order_id: String,

    /// Set once a payment was reported for the order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,

    /// Supplied signature, kept for audit on both outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_signature: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-refresh of an `attempted` row at order creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchaseAttempt {
    pub event_id: Uuid,
    pub customer_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
    pub razorpay_order_id: String,
}

/// Data needed to move a row to `paid`.
///
/// `event_id`, `amount`, `currency` and `description` come from the gateway order and
/// are only used when no attempted row exists for the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    pub event_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
}
