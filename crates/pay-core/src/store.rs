//! # Store Traits
//!
//! Persistence seams for the checkout flow. The Postgres implementation lives in
//! pay-store; an in-memory one in `memory` (feature `test-utils`).

use crate::account::{NewUser, User};
use crate::customer::{Customer, NewCustomer};
use crate::error::PaymentResult;
use crate::event::{Event, EventFilter, NewEvent};
use crate::purchase::{NewPurchaseAttempt, Purchase, Settlement};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Events and the purchase rows reported against them
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_event(&self, id: Uuid) -> PaymentResult<Option<Event>>;

    /// Newest first.
    async fn list_events(&self, filter: &EventFilter) -> PaymentResult<Vec<Event>>;

    async fn create_event(&self, event: &NewEvent) -> PaymentResult<Event>;

    /// All purchases for the given events, joined with their customer.
    async fn purchases_for_events(
        &self,
        event_ids: &[Uuid],
    ) -> PaymentResult<Vec<(Purchase, Customer)>>;
}

/// Customers and purchase rows. The checkout service is the only writer.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Insert, or on email conflict overwrite name/mobile. Returns the customer id.
    async fn upsert_customer(&self, customer: &NewCustomer) -> PaymentResult<Uuid>;

    /// Insert an `attempted` row, or on order-id conflict refresh
    /// amount/currency/description.
    async fn record_attempt(&self, attempt: &NewPurchaseAttempt) -> PaymentResult<Purchase>;

    async fn find_purchase(&self, razorpay_order_id: &str) -> PaymentResult<Option<Purchase>>;

    /// Mark the row `failed`, keeping the supplied ids for audit. Paid rows are left
    /// untouched; returns the row as stored afterwards, if any.
    async fn mark_failed(
        &self,
        razorpay_order_id: &str,
        razorpay_payment_id: &str,
        razorpay_signature: &str,
    ) -> PaymentResult<Option<Purchase>>;

    /// In one transaction: upsert the customer, then move the purchase to `paid`
    /// (inserting it from the settlement when no row exists).
    async fn settle_paid(
        &self,
        customer: &NewCustomer,
        settlement: &Settlement,
    ) -> PaymentResult<Purchase>;
}

/// User accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> PaymentResult<Option<User>>;

    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: &NewUser) -> PaymentResult<User>;
}

pub type BoxedEventStore = Arc<dyn EventStore>;
pub type BoxedPurchaseStore = Arc<dyn PurchaseStore>;
pub type BoxedAccountStore = Arc<dyn AccountStore>;
