//! # pay-razorpay
//!
//! Razorpay gateway for event-checkout-rs.
//!
//! Implements `PaymentGateway` over the Razorpay Orders API:
//! - `POST /v1/orders` creates the order the checkout widget pays against
//! - `GET /v1/orders/{id}` recovers the order notes after payment
//!
//! Payment signatures are checked in `pay_core::signature` with the same key secret.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_razorpay::RazorpayGateway;
//! use pay_core::PaymentGateway;
//!
//! let gateway = RazorpayGateway::from_env()?;
//! let order = gateway.create_order(&request).await?;
//! ```

pub mod config;
pub mod orders;

// Re-exports
pub use config::RazorpayConfig;
pub use orders::RazorpayGateway;
