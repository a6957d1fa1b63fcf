//! Notifier used when no SMTP host is configured: writes a log line per email.

use async_trait::async_trait;
use pay_core::{Notifier, PaymentConfirmation, PaymentResult};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_payment_confirmation(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> PaymentResult<()> {
        info!(
            to = %confirmation.customer_email,
            event = %confirmation.event_title,
            amount = %confirmation.amount,
            currency = %confirmation.currency,
            order_id = %confirmation.order_id,
            payment_id = %confirmation.payment_id,
            "[email] payment confirmation"
        );
        Ok(())
    }

    async fn send_admin_notification(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> PaymentResult<()> {
        info!(
            customer = %confirmation.customer_email,
            order_id = %confirmation.order_id,
            "[email] admin notification"
        );
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "log"
    }
}
