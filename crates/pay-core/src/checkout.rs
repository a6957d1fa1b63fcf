//! # Checkout Service
//!
//! Orchestrates the two halves of a payment:
//!
//! ```text
//! create_order:   validate → event price → gateway order → customer upsert → attempted row
//! verify_payment: validate → HMAC check ─┬─ mismatch → row failed
//!                                        └─ match    → gateway notes → (customer + paid row) → email
//! ```
//!
//! The service is the only writer of purchase status. Email goes out on a detached
//! task after the paid row is committed; its outcome never reaches the caller.

use crate::clock::{BoxedClock, SystemClock};
use crate::customer::NewCustomer;
use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{BoxedPaymentGateway, GatewayOrderRequest, OrderNotes};
use crate::money::Currency;
use crate::notify::{dispatch_confirmation, BoxedNotifier, PaymentConfirmation};
use crate::purchase::{NewPurchaseAttempt, PurchaseStatus, Settlement};
use crate::signature::verify_payment_signature;
use crate::store::{BoxedEventStore, BoxedPurchaseStore};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const PAYMENT_VERIFIED: &str = "Payment verified";
pub const PAYMENT_VERIFICATION_FAILED: &str = "Payment verification failed";

/// Body of the create-order call. Fields are optional so that missing ones
/// surface as `InvalidInput` rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderInput {
    customer: NewCustomer,
    description: Option<String>,
    event_id: Uuid,
    raw_event_id: String,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CreateOrderRequest {
    fn validate(&self) -> PaymentResult<OrderInput> {
        let fields = [
            ("customer_name", present(&self.customer_name)),
            ("mobile", present(&self.mobile)),
            ("email", present(&self.email)),
            ("event_id", present(&self.event_id)),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(PaymentError::InvalidInput(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let [(_, Some(name)), (_, Some(mobile)), (_, Some(email)), (_, Some(raw_event_id))] =
            fields
        else {
            return Err(PaymentError::Internal("required field vanished".into()));
        };

        let event_id = Uuid::parse_str(&raw_event_id)
            .map_err(|_| PaymentError::InvalidInput(format!("Invalid event_id: {}", raw_event_id)))?;

        Ok(OrderInput {
            customer: NewCustomer {
                name,
                email,
                mobile,
            },
            description: present(&self.description),
            event_id,
            raw_event_id,
        })
    }
}

/// Customer details the gateway widget is pre-filled with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    /// Public key id; the secret never leaves the server
    pub key_id: String,
    pub prefill: Prefill,
}

/// Body of the verification callback
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub razorpay_signature: Option<String>,
}

impl VerifyPaymentRequest {
    fn validate(&self) -> PaymentResult<(String, String, String)> {
        match (
            present(&self.razorpay_order_id),
            present(&self.razorpay_payment_id),
            present(&self.razorpay_signature),
        ) {
            (Some(order_id), Some(payment_id), Some(signature)) => {
                Ok((order_id, payment_id, signature))
            }
            _ => Err(PaymentError::InvalidInput(
                "Missing razorpay verification fields".into(),
            )),
        }
    }
}

/// Result of a verification callback. A mismatch is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    pub success: bool,
    pub message: String,
}

impl VerificationOutcome {
    pub fn verified() -> Self {
        Self {
            success: true,
            message: PAYMENT_VERIFIED.to_string(),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            message: PAYMENT_VERIFICATION_FAILED.to_string(),
        }
    }
}

/// Order creation and payment verification over injected collaborators
pub struct CheckoutService {
    events: BoxedEventStore,
    purchases: BoxedPurchaseStore,
    gateway: BoxedPaymentGateway,
    notifier: BoxedNotifier,
    clock: BoxedClock,
    key_secret: String,
    currency: Currency,
}

impl CheckoutService {
    pub fn new(
        events: BoxedEventStore,
        purchases: BoxedPurchaseStore,
        gateway: BoxedPaymentGateway,
        notifier: BoxedNotifier,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            events,
            purchases,
            gateway,
            notifier,
            clock: Arc::new(SystemClock),
            key_secret: key_secret.into(),
            currency: Currency::INR,
        }
    }

    pub fn with_clock(mut self, clock: BoxedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Public key id of the configured gateway
    pub fn key_id(&self) -> &str {
        self.gateway.key_id()
    }

    fn receipt(&self, raw_event_id: &str) -> String {
        let prefix = raw_event_id.split('-').next().unwrap_or(raw_event_id);
        format!("evt_{}_{}", prefix, self.clock.now().timestamp_millis())
    }

    /// Create a gateway order for an event and record the attempt.
    #[instrument(skip(self, request), fields(provider = self.gateway.provider_name()))]
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> PaymentResult<CreateOrderResponse> {
        let input = request.validate()?;

        let event = self
            .events
            .find_event(input.event_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("Event", input.event_id.to_string()))?;

        let amount = self.currency.to_minor_units(event.price)?;

        let order = self
            .gateway
            .create_order(&GatewayOrderRequest {
                amount,
                currency: self.currency,
                receipt: self.receipt(&input.raw_event_id),
                notes: OrderNotes {
                    event_id: Some(input.raw_event_id.clone()),
                    customer_name: Some(input.customer.name.clone()),
                    email: Some(input.customer.email.clone()),
                    mobile: Some(input.customer.mobile.clone()),
                    description: input.description.clone(),
                },
            })
            .await?;

        let customer_id = self.purchases.upsert_customer(&input.customer).await?;

        self.purchases
            .record_attempt(&NewPurchaseAttempt {
                event_id: event.id,
                customer_id,
                amount: order.amount,
                currency: order.currency.clone(),
                description: input.description.clone(),
                razorpay_order_id: order.id.clone(),
            })
            .await?;

        info!(
            order_id = %order.id,
            event_id = %event.id,
            amount = order.amount,
            "Order created"
        );

        Ok(CreateOrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            key_id: self.gateway.key_id().to_string(),
            prefill: Prefill {
                name: input.customer.name,
                email: input.customer.email,
                contact: input.customer.mobile,
            },
        })
    }

    /// Check the callback signature and settle or fail the purchase.
    #[instrument(skip(self, request), fields(provider = self.gateway.provider_name()))]
    pub async fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> PaymentResult<VerificationOutcome> {
        let (order_id, payment_id, signature) = request.validate()?;

        let valid = verify_payment_signature(&self.key_secret, &order_id, &payment_id, &signature)?;

        if !valid {
            let row = self
                .purchases
                .mark_failed(&order_id, &payment_id, &signature)
                .await?;
            match row {
                Some(row) if row.status == PurchaseStatus::Paid => {
                    warn!(order_id = %order_id, "Signature mismatch against a paid purchase; left as paid")
                }
                Some(_) => warn!(order_id = %order_id, "Signature mismatch; purchase marked failed"),
                None => warn!(order_id = %order_id, "Signature mismatch for unknown order"),
            }
            return Ok(VerificationOutcome::failed());
        }

        if let Some(existing) = self.purchases.find_purchase(&order_id).await? {
            if existing.status == PurchaseStatus::Paid {
                info!(
                    order_id = %order_id,
                    payment_id = %payment_id,
                    stored_payment_id = ?existing.razorpay_payment_id,
                    "Payment already verified"
                );
                return Ok(VerificationOutcome::verified());
            }
        }

        let order = self.gateway.fetch_order(&order_id).await?;
        let details = order.notes.checkout_details()?;

        let purchase = self
            .purchases
            .settle_paid(
                &details.customer,
                &Settlement {
                    razorpay_order_id: order_id.clone(),
                    razorpay_payment_id: payment_id.clone(),
                    razorpay_signature: signature,
                    event_id: details.event_id,
                    amount: order.amount,
                    currency: order.currency.clone(),
                    description: details.description.clone(),
                },
            )
            .await?;

        // A concurrent callback may have settled the row first
        if purchase.razorpay_payment_id.as_deref() != Some(payment_id.as_str()) {
            info!(
                order_id = %order_id,
                payment_id = %payment_id,
                stored_payment_id = ?purchase.razorpay_payment_id,
                "Payment already verified"
            );
            return Ok(VerificationOutcome::verified());
        }

        info!(
            order_id = %order_id,
            payment_id = %payment_id,
            amount = purchase.amount,
            "Payment verified"
        );

        let event = match self.events.find_event(details.event_id).await {
            Ok(event) => event,
            Err(e) => {
                warn!(event_id = %details.event_id, error = %e, "Event lookup for confirmation failed");
                None
            }
        };

        let currency = Currency::from_str(&purchase.currency).unwrap_or(self.currency);
        let confirmation = PaymentConfirmation {
            customer_name: details.customer.name,
            customer_email: details.customer.email,
            customer_mobile: details.customer.mobile,
            event_title: event
                .as_ref()
                .map(|e| e.title.clone())
                .unwrap_or_else(|| "your event".to_string()),
            event_date: event.as_ref().map(|e| e.event_date),
            event_time: event.as_ref().map(|e| e.event_time.clone()),
            amount: currency.from_minor_units(purchase.amount),
            currency: currency.to_string(),
            payment_id,
            order_id,
        };
        dispatch_confirmation(self.notifier.clone(), confirmation);

        Ok(VerificationOutcome::verified())
    }
}
