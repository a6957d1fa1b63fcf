//! # pay-notify
//!
//! Email notifications for event-checkout-rs.
//!
//! - **SmtpNotifier** sends the HTML confirmation (and the optional admin
//!   notification) over SMTP
//! - **LoggingNotifier** only logs; used when `SMTP_HOST` is unset
//!
//! ```rust,ignore
//! let notifier = pay_notify::notifier_from_env()?;
//! pay_core::dispatch_confirmation(notifier, confirmation);
//! ```

pub mod config;
pub mod logging;
pub mod smtp;
pub mod templates;

use pay_core::{BoxedNotifier, PaymentResult};
use std::sync::Arc;
use tracing::{info, warn};

// Re-exports
pub use config::MailConfig;
pub use logging::LoggingNotifier;
pub use smtp::SmtpNotifier;

/// SMTP notifier when mail is configured, logging notifier otherwise
pub fn notifier_from_env() -> PaymentResult<BoxedNotifier> {
    match MailConfig::from_env()? {
        Some(config) => {
            info!(host = %config.smtp_host, port = config.smtp_port, "SMTP notifications enabled");
            Ok(Arc::new(SmtpNotifier::new(config)?))
        }
        None => {
            warn!("SMTP_HOST not set; confirmation emails will only be logged");
            Ok(Arc::new(LoggingNotifier))
        }
    }
}
