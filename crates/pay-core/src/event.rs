//! # Event Types
//!
//! Events are the purchasable items: a dated session with a price in major units.
//! Also holds the admin reporting view that rolls purchases up per event.

use crate::customer::Customer;
use crate::error::{PaymentError, PaymentResult};
use crate::money::Currency;
use crate::purchase::{Purchase, PurchaseStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A registrable event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,

    /// Price in major currency units
    pub price: Decimal,

    pub title: String,

    /// Description paragraphs
    pub description: Vec<String>,

    pub event_date: NaiveDate,

    /// Free-form start time as shown to customers (e.g. "18:30 IST")
    pub event_time: String,

    /// Duration in minutes
    pub event_duration: i32,

    /// Hidden events are only listed for admins
    pub is_hidden: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of the admin create-event operation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub price: Decimal,
    pub title: String,
    #[serde(default)]
    pub description: Vec<String>,
    pub event_date: NaiveDate,
    pub event_time: String,
    pub event_duration: i32,
    /// New events start hidden unless stated otherwise
    #[serde(default = "default_hidden")]
    pub is_hidden: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_hidden() -> bool {
    true
}

impl NewEvent {
    /// Reject events that could never be checked out
    pub fn validate(&self) -> PaymentResult<()> {
        if self.title.trim().is_empty() {
            return Err(PaymentError::InvalidInput("Event title is required".into()));
        }
        if self.price <= Decimal::ZERO {
            return Err(PaymentError::InvalidInput(
                "Event price must be positive".into(),
            ));
        }
        if self.event_duration <= 0 {
            return Err(PaymentError::InvalidInput(
                "Event duration must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Store-level filter for event listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub id: Option<Uuid>,
    /// `Some(false)` restricts to visible events
    pub is_hidden: Option<bool>,
}

impl EventFilter {
    /// Filter applied for anonymous and non-admin callers
    pub fn public(id: Option<Uuid>) -> Self {
        Self {
            id,
            is_hidden: Some(false),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.id.map_or(true, |id| event.id == id)
            && self.is_hidden.map_or(true, |hidden| event.is_hidden == hidden)
    }
}

/// Customer identity inside a report entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportCustomer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: String,
}

impl From<&Customer> for ReportCustomer {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            email: c.email.clone(),
            mobile: c.mobile.clone(),
        }
    }
}

/// Payment details inside a report entry (amount in major units)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayment {
    pub purchase_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: PurchaseStatus,
    pub razorpay_order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub customer: ReportCustomer,
    #[serde(rename = "paymentDetails")]
    pub payment_details: ReportPayment,
    #[serde(
        rename = "reasonForUnsuccessfulPayment",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason_for_unsuccessful_payment: Option<PurchaseStatus>,
}

/// Admin view of an event with its purchases rolled up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventReport {
    #[serde(flatten)]
    pub event: Event,
    pub total_registrations: i64,
    pub successful_payments: i64,
    pub total_revenue: Decimal,
    pub attempted_payments: i64,
    #[serde(rename = "successfulPayment")]
    pub successful_payment: Vec<ReportEntry>,
    #[serde(rename = "unsuccessfulPayment")]
    pub unsuccessful_payment: Vec<ReportEntry>,
}

impl EventReport {
    /// Roll up the purchases of one event.
    ///
    /// Rows belonging to other events are ignored. Unsuccessful entries keep only the
    /// latest attempt per customer, and only for customers who never paid.
    pub fn build(event: Event, rows: &[(Purchase, Customer)]) -> Self {
        let rows: Vec<&(Purchase, Customer)> =
            rows.iter().filter(|(p, _)| p.event_id == event.id).collect();

        let mut successful_payment = Vec::new();
        let mut total_revenue = Decimal::ZERO;
        let mut attempted_payments = 0;
        let mut paying_customers = HashSet::new();

        for (purchase, customer) in &rows {
            match purchase.status {
                PurchaseStatus::Paid => {
                    total_revenue += minor_to_major(purchase);
                    paying_customers.insert(customer.id);
                    successful_payment.push(entry(purchase, customer, None));
                }
                PurchaseStatus::Created | PurchaseStatus::Attempted | PurchaseStatus::Failed => {
                    attempted_payments += 1;
                }
                PurchaseStatus::Refunded => {}
            }
        }

        let mut latest_unpaid: HashMap<Uuid, &(Purchase, Customer)> = HashMap::new();
        for &row in &rows {
            let (purchase, customer) = row;
            if purchase.status == PurchaseStatus::Paid || paying_customers.contains(&customer.id) {
                continue;
            }
            latest_unpaid
                .entry(customer.id)
                .and_modify(|current| {
                    if purchase.created_at > current.0.created_at {
                        *current = row;
                    }
                })
                .or_insert(row);
        }

        let mut unsuccessful_payment: Vec<ReportEntry> = latest_unpaid
            .into_values()
            .map(|(purchase, customer)| entry(purchase, customer, Some(purchase.status)))
            .collect();

        successful_payment.sort_by_key(|e| e.payment_details.created_at);
        unsuccessful_payment.sort_by_key(|e| e.payment_details.created_at);

        Self {
            total_registrations: rows.len() as i64,
            successful_payments: successful_payment.len() as i64,
            total_revenue,
            attempted_payments,
            successful_payment,
            unsuccessful_payment,
            event,
        }
    }
}

fn minor_to_major(purchase: &Purchase) -> Decimal {
    purchase
        .currency
        .parse::<Currency>()
        .unwrap_or_default()
        .from_minor_units(purchase.amount)
}

fn entry(purchase: &Purchase, customer: &Customer, reason: Option<PurchaseStatus>) -> ReportEntry {
    ReportEntry {
        customer: customer.into(),
        payment_details: ReportPayment {
            purchase_id: purchase.id,
            amount: minor_to_major(purchase),
            currency: purchase.currency.clone(),
            status: purchase.status,
            razorpay_order_id: purchase.razorpay_order_id.clone(),
            razorpay_payment_id: purchase.razorpay_payment_id.clone(),
            created_at: purchase.created_at,
        },
        reason_for_unsuccessful_payment: reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event() -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            price: Decimal::new(50000, 2),
            title: "GST Masterclass".into(),
            description: vec!["Two hours on filings".into()],
            event_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            event_time: "18:30".into(),
            event_duration: 120,
            is_hidden: false,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn customer(email: &str) -> Customer {
        let now = Utc::now();
        Customer {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: email.into(),
            mobile: "9800000000".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn purchase(event_id: Uuid, customer_id: Uuid, status: PurchaseStatus, age_mins: i64) -> Purchase {
        let at = Utc::now() - Duration::minutes(age_mins);
        Purchase {
            id: Uuid::new_v4(),
            event_id,
            customer_id,
            amount: 50000,
            currency: "INR".into(),
            description: None,
            status,
            razorpay_order_id: format!("order_{}", Uuid::new_v4().simple()),
            razorpay_payment_id: None,
            razorpay_signature: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_report_rollup() {
        let ev = event();
        let paid = customer("paid@example.com");
        let retried = customer("retry@example.com");
        let gave_up = customer("gaveup@example.com");

        let rows = vec![
            (purchase(ev.id, paid.id, PurchaseStatus::Failed, 30), paid.clone()),
            (purchase(ev.id, paid.id, PurchaseStatus::Paid, 20), paid.clone()),
            (purchase(ev.id, retried.id, PurchaseStatus::Failed, 15), retried.clone()),
            (purchase(ev.id, retried.id, PurchaseStatus::Attempted, 5), retried.clone()),
            (purchase(ev.id, gave_up.id, PurchaseStatus::Attempted, 10), gave_up.clone()),
            (purchase(Uuid::new_v4(), gave_up.id, PurchaseStatus::Paid, 1), gave_up.clone()),
        ];

        let report = EventReport::build(ev, &rows);

        assert_eq!(report.total_registrations, 5);
        assert_eq!(report.successful_payments, 1);
        assert_eq!(report.attempted_payments, 4);
        assert_eq!(report.total_revenue, Decimal::new(500, 0));

        // paying customer is excluded from the unsuccessful list
        assert_eq!(report.unsuccessful_payment.len(), 2);
        let retry_entry = report
            .unsuccessful_payment
            .iter()
            .find(|e| e.customer.id == retried.id)
            .unwrap();
        assert_eq!(
            retry_entry.reason_for_unsuccessful_payment,
            Some(PurchaseStatus::Attempted)
        );
    }

    #[test]
    fn test_report_serialization_shape() {
        let report = EventReport::build(event(), &[]);
        let json = serde_json::to_value(&report).unwrap();

        assert!(json.get("title").is_some());
        assert!(json.get("successfulPayment").unwrap().is_array());
        assert!(json.get("unsuccessfulPayment").unwrap().is_array());
        assert_eq!(json.get("total_registrations").unwrap(), 0);
    }

    #[test]
    fn test_new_event_defaults_and_validation() {
        let body = serde_json::json!({
            "price": "499.00",
            "title": "Tax Clinic",
            "eventDate": "2026-12-01",
            "eventTime": "10:00",
            "eventDuration": 90
        });
        let new_event: NewEvent = serde_json::from_value(body).unwrap();
        assert!(new_event.is_hidden);
        assert!(new_event.validate().is_ok());

        let free = NewEvent {
            price: Decimal::ZERO,
            ..new_event
        };
        assert!(matches!(free.validate(), Err(PaymentError::InvalidInput(_))));
    }

    #[test]
    fn test_public_filter_hides_hidden_events() {
        let mut ev = event();
        assert!(EventFilter::public(None).matches(&ev));
        ev.is_hidden = true;
        assert!(!EventFilter::public(None).matches(&ev));
        assert!(EventFilter::default().matches(&ev));
        assert!(!EventFilter::public(Some(Uuid::new_v4())).matches(&ev));
    }
}
