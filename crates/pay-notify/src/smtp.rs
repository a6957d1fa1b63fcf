//! # SMTP Notifier
//!
//! Sends the rendered templates through an async lettre transport.

use crate::config::MailConfig;
use crate::templates::{self, RenderedEmail};
use async_trait::async_trait;
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pay_core::{Notifier, PaymentConfirmation, PaymentError, PaymentResult};
use tracing::{debug, instrument};

pub struct SmtpNotifier {
    config: MailConfig,
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> PaymentResult<Self> {
        let from: Mailbox = config
            .from_header()
            .parse()
            .map_err(|e| PaymentError::Configuration(format!("Invalid from address: {}", e)))?;

        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .map_err(|e| PaymentError::Configuration(format!("SMTP relay error: {}", e)))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            config,
            from,
            transport,
        })
    }

    fn message(&self, to: &str, email: RenderedEmail) -> PaymentResult<Message> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| PaymentError::Notification(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)
            .map_err(|e| PaymentError::Notification(format!("Failed to build email: {}", e)))
    }

    async fn send(&self, message: Message) -> PaymentResult<()> {
        self.transport
            .send(message)
            .await
            .map_err(|e| PaymentError::Notification(format!("Failed to send email: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[instrument(skip(self, confirmation), fields(order_id = %confirmation.order_id))]
    async fn send_payment_confirmation(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> PaymentResult<()> {
        let email = templates::payment_confirmation(
            confirmation,
            &self.config.support_email,
            self.config.whatsapp_link.as_deref(),
        );
        let message = self.message(&confirmation.customer_email, email)?;
        self.send(message).await
    }

    #[instrument(skip(self, confirmation), fields(order_id = %confirmation.order_id))]
    async fn send_admin_notification(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> PaymentResult<()> {
        let Some(admin) = self.config.admin_email.as_deref() else {
            debug!("No admin address configured");
            return Ok(());
        };

        let email = templates::admin_notification(confirmation, Utc::now());
        let message = self.message(admin, email)?;
        self.send(message).await
    }

    fn channel(&self) -> &'static str {
        "smtp"
    }
}
