//! # pay-core
//!
//! Core types and traits for the event-checkout payment engine.
//!
//! This crate provides:
//! - `PaymentGateway` trait for the order-owning payment provider
//! - `EventStore`, `PurchaseStore` and `AccountStore` persistence traits
//! - `CheckoutService` for order creation and signature verification
//! - `EventCatalog` for event listing, admin reports and creation
//! - `Notifier` and the detached confirmation dispatch
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{CheckoutService, CreateOrderRequest, VerifyPaymentRequest};
//!
//! let checkout = CheckoutService::new(store.clone(), store, gateway, notifier, key_secret);
//!
//! // Hand the order to the client-side widget
//! let order = checkout.create_order(&request).await?;
//!
//! // Once the widget reports back
//! let outcome = checkout.verify_payment(&callback).await?;
//! assert!(outcome.success);
//! ```

pub mod account;
pub mod catalog;
pub mod checkout;
pub mod clock;
pub mod customer;
pub mod error;
pub mod event;
pub mod gateway;
pub mod money;
pub mod notify;
pub mod purchase;
pub mod signature;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

// Re-exports for convenience
pub use account::{NewUser, PublicUser, User};
pub use catalog::{EventCatalog, EventListing, EventQuery};
pub use checkout::{
    CheckoutService, CreateOrderRequest, CreateOrderResponse, Prefill, VerificationOutcome,
    VerifyPaymentRequest,
};
pub use clock::{BoxedClock, Clock, FixedClock, SystemClock};
pub use customer::{Customer, NewCustomer};
pub use error::{PaymentError, PaymentResult};
pub use event::{Event, EventFilter, EventReport, NewEvent, ReportEntry};
pub use gateway::{
    BoxedPaymentGateway, CheckoutDetails, GatewayOrder, GatewayOrderRequest, OrderNotes,
    PaymentGateway,
};
pub use money::Currency;
pub use notify::{dispatch_confirmation, BoxedNotifier, Notifier, PaymentConfirmation};
pub use purchase::{NewPurchaseAttempt, Purchase, PurchaseStatus, Settlement};
pub use signature::{compute_payment_signature, verify_payment_signature};
pub use store::{
    AccountStore, BoxedAccountStore, BoxedEventStore, BoxedPurchaseStore, EventStore,
    PurchaseStore,
};
