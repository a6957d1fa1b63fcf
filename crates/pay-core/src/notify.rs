//! # Notifications
//!
//! Post-payment emails. Delivery is best effort: the verification flow hands the
//! message to a detached task and only the task logs how it went.

use crate::error::PaymentResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Everything the confirmation templates need
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentConfirmation {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_mobile: String,
    pub event_title: String,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<String>,
    /// Amount in major units
    pub amount: Decimal,
    pub currency: String,
    pub payment_id: String,
    pub order_id: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Confirmation to the customer.
    async fn send_payment_confirmation(&self, confirmation: &PaymentConfirmation)
        -> PaymentResult<()>;

    /// Heads-up to the organisers. Not every transport has one configured.
    async fn send_admin_notification(
        &self,
        _confirmation: &PaymentConfirmation,
    ) -> PaymentResult<()> {
        Ok(())
    }

    /// Transport name (for logging).
    fn channel(&self) -> &'static str;
}

pub type BoxedNotifier = Arc<dyn Notifier>;

/// Send both emails on a detached task. Errors are logged, never returned.
pub fn dispatch_confirmation(
    notifier: BoxedNotifier,
    confirmation: PaymentConfirmation,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let channel = notifier.channel();

        match notifier.send_payment_confirmation(&confirmation).await {
            Ok(()) => info!(
                channel,
                order_id = %confirmation.order_id,
                to = %confirmation.customer_email,
                "Payment confirmation sent"
            ),
            Err(e) => error!(
                channel,
                order_id = %confirmation.order_id,
                error = %e,
                "Payment confirmation failed"
            ),
        }

        if let Err(e) = notifier.send_admin_notification(&confirmation).await {
            error!(
                channel,
                order_id = %confirmation.order_id,
                error = %e,
                "Admin notification failed"
            );
        }
    })
}
