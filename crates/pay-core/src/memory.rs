//! # In-Memory Test Doubles
//!
//! `MemoryStore` implements every store trait over plain vectors; `StubGateway`
//! hands out sequential order ids; `RecordingNotifier` keeps what it was asked to
//! send. Each counts its calls so tests can assert that nothing was touched.

use crate::account::{NewUser, User};
use crate::customer::{Customer, NewCustomer};
use crate::error::{PaymentError, PaymentResult};
use crate::event::{Event, EventFilter, NewEvent};
use crate::gateway::{GatewayOrder, GatewayOrderRequest, PaymentGateway};
use crate::notify::{Notifier, PaymentConfirmation};
use crate::purchase::{NewPurchaseAttempt, Purchase, PurchaseStatus, Settlement};
use crate::store::{AccountStore, EventStore, PurchaseStore};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    events: Vec<Event>,
    customers: Vec<Customer>,
    purchases: Vec<Purchase>,
    users: Vec<User>,
}

/// Store backed by vectors behind a mutex
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> PaymentResult<MutexGuard<'_, Tables>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .lock()
            .map_err(|_| PaymentError::Internal("memory store poisoned".into()))
    }

    /// Number of store operations performed so far (seeding excluded)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Insert an event directly, bypassing validation.
    pub fn seed_event(&self, price: Decimal, title: &str, is_hidden: bool) -> Event {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            price,
            title: title.to_string(),
            description: vec![format!("{} description", title)],
            event_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap_or_default(),
            event_time: "18:30".to_string(),
            event_duration: 90,
            is_hidden,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        if let Ok(mut tables) = self.tables.lock() {
            tables.events.push(event.clone());
        }
        event
    }

    /// Insert a purchase row directly.
    pub fn seed_purchase(&self, purchase: Purchase) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.purchases.push(purchase);
        }
    }

    pub fn purchases(&self) -> Vec<Purchase> {
        self.tables
            .lock()
            .map(|t| t.purchases.clone())
            .unwrap_or_default()
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.tables
            .lock()
            .map(|t| t.customers.clone())
            .unwrap_or_default()
    }

    pub fn purchase(&self, razorpay_order_id: &str) -> Option<Purchase> {
        self.purchases()
            .into_iter()
            .find(|p| p.razorpay_order_id == razorpay_order_id)
    }
}

fn upsert_customer_in(tables: &mut Tables, customer: &NewCustomer) -> Uuid {
    let now = Utc::now();
    if let Some(existing) = tables
        .customers
        .iter_mut()
        .find(|c| c.email == customer.email)
    {
        existing.name = customer.name.clone();
        existing.mobile = customer.mobile.clone();
        existing.updated_at = now;
        return existing.id;
    }

    let id = Uuid::new_v4();
    tables.customers.push(Customer {
        id,
        name: customer.name.clone(),
        email: customer.email.clone(),
        mobile: customer.mobile.clone(),
        created_at: now,
        updated_at: now,
    });
    id
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn find_event(&self, id: Uuid) -> PaymentResult<Option<Event>> {
        Ok(self.tables()?.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_events(&self, filter: &EventFilter) -> PaymentResult<Vec<Event>> {
        let tables = self.tables()?;
        let mut events: Vec<Event> = tables
            .events
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn create_event(&self, event: &NewEvent) -> PaymentResult<Event> {
        let now = Utc::now();
        let created = Event {
            id: Uuid::new_v4(),
            price: event.price,
            title: event.title.clone(),
            description: event.description.clone(),
            event_date: event.event_date,
            event_time: event.event_time.clone(),
            event_duration: event.event_duration,
            is_hidden: event.is_hidden,
            image_url: event.image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables()?.events.push(created.clone());
        Ok(created)
    }

    async fn purchases_for_events(
        &self,
        event_ids: &[Uuid],
    ) -> PaymentResult<Vec<(Purchase, Customer)>> {
        let tables = self.tables()?;
        Ok(tables
            .purchases
            .iter()
            .filter(|p| event_ids.contains(&p.event_id))
            .filter_map(|p| {
                tables
                    .customers
                    .iter()
                    .find(|c| c.id == p.customer_id)
                    .map(|c| (p.clone(), c.clone()))
            })
            .collect())
    }
}

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn upsert_customer(&self, customer: &NewCustomer) -> PaymentResult<Uuid> {
        let mut tables = self.tables()?;
        Ok(upsert_customer_in(&mut tables, customer))
    }

    async fn record_attempt(&self, attempt: &NewPurchaseAttempt) -> PaymentResult<Purchase> {
        let mut tables = self.tables()?;
        let now = Utc::now();

        if let Some(row) = tables
            .purchases
            .iter_mut()
            .find(|p| p.razorpay_order_id == attempt.razorpay_order_id)
        {
            row.amount = attempt.amount;
            row.currency = attempt.currency.clone();
            row.description = attempt.description.clone();
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = Purchase {
            id: Uuid::new_v4(),
            event_id: attempt.event_id,
            customer_id: attempt.customer_id,
            amount: attempt.amount,
            currency: attempt.currency.clone(),
            description: attempt.description.clone(),
            status: PurchaseStatus::Attempted,
            razorpay_order_id: attempt.razorpay_order_id.clone(),
            razorpay_payment_id: None,
            razorpay_signature: None,
            created_at: now,
            updated_at: now,
        };
        tables.purchases.push(row.clone());
        Ok(row)
    }

    async fn find_purchase(&self, razorpay_order_id: &str) -> PaymentResult<Option<Purchase>> {
        Ok(self
            .tables()?
            .purchases
            .iter()
            .find(|p| p.razorpay_order_id == razorpay_order_id)
            .cloned())
    }

    async fn mark_failed(
        &self,
        razorpay_order_id: &str,
        razorpay_payment_id: &str,
        razorpay_signature: &str,
    ) -> PaymentResult<Option<Purchase>> {
        let mut tables = self.tables()?;
        let Some(row) = tables
            .purchases
            .iter_mut()
            .find(|p| p.razorpay_order_id == razorpay_order_id)
        else {
            return Ok(None);
        };

        if row.status.after_verification(false) == PurchaseStatus::Failed {
            row.status = PurchaseStatus::Failed;
            row.razorpay_payment_id = Some(razorpay_payment_id.to_string());
            row.razorpay_signature = Some(razorpay_signature.to_string());
            row.updated_at = Utc::now();
        }
        Ok(Some(row.clone()))
    }

    async fn settle_paid(
        &self,
        customer: &NewCustomer,
        settlement: &Settlement,
    ) -> PaymentResult<Purchase> {
        let mut tables = self.tables()?;
        let customer_id = upsert_customer_in(&mut tables, customer);
        let now = Utc::now();

        if let Some(row) = tables
            .purchases
            .iter_mut()
            .find(|p| p.razorpay_order_id == settlement.razorpay_order_id)
        {
            if row.status.after_verification(true) == PurchaseStatus::Paid
                && row.status != PurchaseStatus::Paid
            {
                row.status = PurchaseStatus::Paid;
                row.razorpay_payment_id = Some(settlement.razorpay_payment_id.clone());
                row.razorpay_signature = Some(settlement.razorpay_signature.clone());
                row.updated_at = now;
            }
            return Ok(row.clone());
        }

        let row = Purchase {
            id: Uuid::new_v4(),
            event_id: settlement.event_id,
            customer_id,
            amount: settlement.amount,
            currency: settlement.currency.clone(),
            description: settlement.description.clone(),
            status: PurchaseStatus::Paid,
            razorpay_order_id: settlement.razorpay_order_id.clone(),
            razorpay_payment_id: Some(settlement.razorpay_payment_id.clone()),
            razorpay_signature: Some(settlement.razorpay_signature.clone()),
            created_at: now,
            updated_at: now,
        };
        tables.purchases.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> PaymentResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: &NewUser) -> PaymentResult<User> {
        let mut tables = self.tables()?;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(PaymentError::Conflict("Email already registered".into()));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }
}

/// Gateway that keeps orders in a map and never leaves the process
#[derive(Debug)]
pub struct StubGateway {
    key_id: String,
    orders: Mutex<HashMap<String, GatewayOrder>>,
    requests: Mutex<Vec<GatewayOrderRequest>>,
    calls: AtomicUsize,
    failing: bool,
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            key_id: "rzp_test_stub".to_string(),
            orders: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            failing: false,
        }
    }

    /// Every call fails with a provider error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Make an order fetchable without going through `create_order`.
    pub fn insert_order(&self, order: GatewayOrder) {
        if let Ok(mut orders) = self.orders.lock() {
            orders.insert(order.id.clone(), order);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GatewayOrderRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn enter(&self) -> PaymentResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(PaymentError::ProviderError {
                provider: "stub".into(),
                message: "gateway unavailable".into(),
            });
        }
        Ok(())
    }

    fn lock_orders(&self) -> PaymentResult<MutexGuard<'_, HashMap<String, GatewayOrder>>> {
        self.orders
            .lock()
            .map_err(|_| PaymentError::Internal("stub gateway poisoned".into()))
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(&self, request: &GatewayOrderRequest) -> PaymentResult<GatewayOrder> {
        self.enter()?;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let mut orders = self.lock_orders()?;
        let order = GatewayOrder {
            id: format!("order_stub{:04}", orders.len() + 1),
            amount: request.amount,
            currency: request.currency.to_string(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".into()),
            notes: request.notes.clone(),
        };
        orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> PaymentResult<GatewayOrder> {
        self.enter()?;
        self.lock_orders()?
            .get(order_id)
            .cloned()
            .ok_or_else(|| PaymentError::ProviderError {
                provider: "stub".into(),
                message: format!("The id provided does not exist: {}", order_id),
            })
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

/// Notifier that records instead of sending
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    confirmations: Mutex<Vec<PaymentConfirmation>>,
    admin_notifications: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmations(&self) -> Vec<PaymentConfirmation> {
        self.confirmations
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn admin_notifications(&self) -> usize {
        self.admin_notifications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_payment_confirmation(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> PaymentResult<()> {
        self.confirmations
            .lock()
            .map_err(|_| PaymentError::Internal("recording notifier poisoned".into()))?
            .push(confirmation.clone());
        Ok(())
    }

    async fn send_admin_notification(
        &self,
        _confirmation: &PaymentConfirmation,
    ) -> PaymentResult<()> {
        self.admin_notifications.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "recording"
    }
}

/// Notifier whose every send fails
#[derive(Debug, Default)]
pub struct FailingNotifier {
    attempts: AtomicUsize,
}

impl FailingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_payment_confirmation(
        &self,
        _confirmation: &PaymentConfirmation,
    ) -> PaymentResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PaymentError::Notification("SMTP connection refused".into()))
    }

    fn channel(&self) -> &'static str {
        "failing"
    }
}
