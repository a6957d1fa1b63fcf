//! # Mail Configuration
//!
//! SMTP settings and the links embedded in confirmation emails.
//! Without `SMTP_HOST` no mail transport is configured at all.

use pay_core::{PaymentError, PaymentResult};
use std::env;

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_NAME: &str = "Event Checkout";

#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    /// 465 uses implicit TLS, anything else STARTTLS
    pub smtp_port: u16,
    /// Login and sender address
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub support_email: String,
    pub whatsapp_link: Option<String>,
    /// Receives "New Payment Received" notifications when set
    pub admin_email: Option<String>,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("from_name", &self.from_name)
            .field("admin_email", &self.admin_email)
            .finish()
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl MailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when `SMTP_HOST` is unset. When it is set, `EMAIL_USER` and
    /// `EMAIL_PASSWORD` are required.
    pub fn from_env() -> PaymentResult<Option<Self>> {
        dotenvy::dotenv().ok();

        let Some(smtp_host) = var("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = match var("SMTP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                PaymentError::Configuration(format!("SMTP_PORT must be a port number: {}", raw))
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let username = var("EMAIL_USER")
            .ok_or_else(|| PaymentError::Configuration("EMAIL_USER not set".to_string()))?;
        let password = var("EMAIL_PASSWORD")
            .ok_or_else(|| PaymentError::Configuration("EMAIL_PASSWORD not set".to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            from_name: var("EMAIL_FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
            support_email: var("SUPPORT_EMAIL").unwrap_or_else(|| username.clone()),
            whatsapp_link: var("WHATSAPP_LINK"),
            admin_email: var("ADMIN_NOTIFY_EMAIL"),
            username,
            password,
        }))
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        smtp_host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let username = username.into();
        Self {
            smtp_host: smtp_host.into(),
            smtp_port: DEFAULT_SMTP_PORT,
            support_email: username.clone(),
            username,
            password: password.into(),
            from_name: DEFAULT_FROM_NAME.to_string(),
            whatsapp_link: None,
            admin_email: None,
        }
    }

    /// Builder: organiser address for admin notifications
    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = Some(email.into());
        self
    }

    /// Builder: community link shown in the confirmation
    pub fn with_whatsapp_link(mut self, link: impl Into<String>) -> Self {
        self.whatsapp_link = Some(link.into());
        self
    }

    /// `Name <address>` sender header
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.username)
    }
}
