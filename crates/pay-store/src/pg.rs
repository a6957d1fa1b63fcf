//! # PostgreSQL Store
//!
//! `PgStore` implements the event, purchase and account stores over one pool.
//! Queries are checked at runtime (`query_as` + `bind`); rows map onto the core
//! types through `TryFrom`.
//!
//! Uniqueness is enforced by the schema:
//! - `customers.email` (upsert target)
//! - `event_purchases.razorpay_order_id` (upsert target)
//! - `users.email` (duplicate signup → `Conflict`)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pay_core::{
    AccountStore, Customer, Event, EventFilter, EventStore, NewCustomer, NewEvent,
    NewPurchaseAttempt, NewUser, PaymentError, PaymentResult, Purchase, PurchaseStatus,
    PurchaseStore, Settlement, User,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

const EVENT_COLUMNS: &str = "id, price, title, description, event_date, event_time, \
     event_duration, is_hidden, image_url, created_at, updated_at";

const PURCHASE_COLUMNS: &str = "id, event_id, customer_id, amount, currency, description, \
     status, razorpay_order_id, razorpay_payment_id, razorpay_signature, created_at, updated_at";

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

/// Map a sqlx error onto the core taxonomy
fn db_err(e: sqlx::Error) -> PaymentError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return PaymentError::Conflict(format!(
                "Duplicate value violates {}",
                db.constraint().unwrap_or("a unique constraint")
            ));
        }
    }
    PaymentError::Database(e.to_string())
}

#[derive(Debug, Clone, FromRow)]
struct EventRow {
    id: Uuid,
    price: Decimal,
    title: String,
    description: Vec<String>,
    event_date: NaiveDate,
    event_time: String,
    event_duration: i32,
    is_hidden: bool,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(r: EventRow) -> Self {
        Event {
            id: r.id,
            price: r.price,
            title: r.title,
            description: r.description,
            event_date: r.event_date,
            event_time: r.event_time,
            event_duration: r.event_duration,
            is_hidden: r.is_hidden,
            image_url: r.image_url,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct PurchaseRow {
    id: Uuid,
    event_id: Uuid,
    customer_id: Uuid,
    amount: i64,
    currency: String,
    description: Option<String>,
    status: String,
    razorpay_order_id: String,
    razorpay_payment_id: Option<String>,
    razorpay_signature: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = PaymentError;

    fn try_from(r: PurchaseRow) -> Result<Self, Self::Error> {
        Ok(Purchase {
            id: r.id,
            event_id: r.event_id,
            customer_id: r.customer_id,
            amount: r.amount,
            currency: r.currency,
            description: r.description,
            status: r.status.parse::<PurchaseStatus>()?,
            razorpay_order_id: r.razorpay_order_id,
            razorpay_payment_id: r.razorpay_payment_id,
            razorpay_signature: r.razorpay_signature,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Purchase joined with its customer (customer columns prefixed `c_`)
#[derive(Debug, Clone, FromRow)]
struct PurchaseCustomerRow {
    #[sqlx(flatten)]
    purchase: PurchaseRow,
    c_id: Uuid,
    c_name: String,
    c_email: String,
    c_mobile: String,
    c_created_at: DateTime<Utc>,
    c_updated_at: DateTime<Utc>,
}

impl TryFrom<PurchaseCustomerRow> for (Purchase, Customer) {
    type Error = PaymentError;

    fn try_from(r: PurchaseCustomerRow) -> Result<Self, Self::Error> {
        let customer = Customer {
            id: r.c_id,
            name: r.c_name,
            email: r.c_email,
            mobile: r.c_mobile,
            created_at: r.c_created_at,
            updated_at: r.c_updated_at,
        };
        Ok((r.purchase.try_into()?, customer))
    }
}

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled migrations.
    pub async fn migrate(&self) -> PaymentResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PaymentError::Database(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    async fn upsert_customer_in(
        tx: &mut Transaction<'_, Postgres>,
        customer: &NewCustomer,
    ) -> PaymentResult<Uuid> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO customers (name, email, mobile)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
                SET name = EXCLUDED.name,
                    mobile = EXCLUDED.mobile,
                    updated_at = now()
            RETURNING id
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.mobile)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(id)
    }

    async fn purchase_by_order_id(
        tx: &mut Transaction<'_, Postgres>,
        razorpay_order_id: &str,
    ) -> PaymentResult<Option<Purchase>> {
        sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {} FROM event_purchases WHERE razorpay_order_id = $1",
            PURCHASE_COLUMNS
        ))
        .bind(razorpay_order_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err)?
        .map(Purchase::try_from)
        .transpose()
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn find_event(&self, id: Uuid) -> PaymentResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Event::from))
    }

    #[instrument(skip(self))]
    async fn list_events(&self, filter: &EventFilter) -> PaymentResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {}
            FROM events
            WHERE ($1::uuid IS NULL OR id = $1)
              AND ($2::boolean IS NULL OR is_hidden = $2)
            ORDER BY created_at DESC
            "#,
            EVENT_COLUMNS
        ))
        .bind(filter.id)
        .bind(filter.is_hidden)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        debug!(count = rows.len(), "Listed events");
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn create_event(&self, event: &NewEvent) -> PaymentResult<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events
                (price, title, description, event_date, event_time, event_duration, is_hidden, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(event.price)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_date)
        .bind(&event.event_time)
        .bind(event.event_duration)
        .bind(event.is_hidden)
        .bind(&event.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    async fn purchases_for_events(
        &self,
        event_ids: &[Uuid],
    ) -> PaymentResult<Vec<(Purchase, Customer)>> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PurchaseCustomerRow>(
            r#"
            SELECT p.id, p.event_id, p.customer_id, p.amount, p.currency, p.description,
                   p.status, p.razorpay_order_id, p.razorpay_payment_id, p.razorpay_signature,
                   p.created_at, p.updated_at,
                   c.id AS c_id, c.name AS c_name, c.email AS c_email, c.mobile AS c_mobile,
                   c.created_at AS c_created_at, c.updated_at AS c_updated_at
            FROM event_purchases p
            JOIN customers c ON c.id = p.customer_id
            WHERE p.event_id = ANY($1)
            ORDER BY p.created_at
            "#,
        )
        .bind(event_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl PurchaseStore for PgStore {
    async fn upsert_customer(&self, customer: &NewCustomer) -> PaymentResult<Uuid> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let id = Self::upsert_customer_in(&mut tx, customer).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(id)
    }

    #[instrument(skip(self, attempt), fields(order_id = %attempt.razorpay_order_id))]
    async fn record_attempt(&self, attempt: &NewPurchaseAttempt) -> PaymentResult<Purchase> {
        sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            INSERT INTO event_purchases
                (event_id, customer_id, amount, currency, description, status, razorpay_order_id)
            VALUES ($1, $2, $3, $4, $5, 'attempted', $6)
            ON CONFLICT (razorpay_order_id) DO UPDATE
                SET amount = EXCLUDED.amount,
                    currency = EXCLUDED.currency,
                    description = EXCLUDED.description,
                    updated_at = now()
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(attempt.event_id)
        .bind(attempt.customer_id)
        .bind(attempt.amount)
        .bind(&attempt.currency)
        .bind(&attempt.description)
        .bind(&attempt.razorpay_order_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?
        .try_into()
    }

    async fn find_purchase(&self, razorpay_order_id: &str) -> PaymentResult<Option<Purchase>> {
        sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {} FROM event_purchases WHERE razorpay_order_id = $1",
            PURCHASE_COLUMNS
        ))
        .bind(razorpay_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .map(Purchase::try_from)
        .transpose()
    }

    #[instrument(skip(self, razorpay_signature))]
    async fn mark_failed(
        &self,
        razorpay_order_id: &str,
        razorpay_payment_id: &str,
        razorpay_signature: &str,
    ) -> PaymentResult<Option<Purchase>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let updated = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            UPDATE event_purchases
               SET status = 'failed',
                   razorpay_payment_id = $2,
                   razorpay_signature = $3,
                   updated_at = now()
             WHERE razorpay_order_id = $1
               AND status NOT IN ('paid', 'refunded')
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(razorpay_order_id)
        .bind(razorpay_payment_id)
        .bind(razorpay_signature)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let purchase = match updated {
            Some(row) => Some(row.try_into()?),
            None => Self::purchase_by_order_id(&mut tx, razorpay_order_id).await?,
        };

        tx.commit().await.map_err(db_err)?;
        Ok(purchase)
    }

    #[instrument(skip(self, customer, settlement), fields(order_id = %settlement.razorpay_order_id))]
    async fn settle_paid(
        &self,
        customer: &NewCustomer,
        settlement: &Settlement,
    ) -> PaymentResult<Purchase> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let customer_id = Self::upsert_customer_in(&mut tx, customer).await?;

        let settled = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            INSERT INTO event_purchases
                (event_id, customer_id, amount, currency, description, status,
                 razorpay_order_id, razorpay_payment_id, razorpay_signature)
            VALUES ($1, $2, $3, $4, $5, 'paid', $6, $7, $8)
            ON CONFLICT (razorpay_order_id) DO UPDATE
                SET status = 'paid',
                    razorpay_payment_id = EXCLUDED.razorpay_payment_id,
                    razorpay_signature = EXCLUDED.razorpay_signature,
                    updated_at = now()
                WHERE event_purchases.status NOT IN ('paid', 'refunded')
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(settlement.event_id)
        .bind(customer_id)
        .bind(settlement.amount)
        .bind(&settlement.currency)
        .bind(&settlement.description)
        .bind(&settlement.razorpay_order_id)
        .bind(&settlement.razorpay_payment_id)
        .bind(&settlement.razorpay_signature)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let purchase = match settled {
            Some(row) => row.try_into()?,
            // Conflict with a row that is already settled
            None => Self::purchase_by_order_id(&mut tx, &settlement.razorpay_order_id)
                .await?
                .ok_or_else(|| {
                    PaymentError::not_found("Purchase", settlement.razorpay_order_id.clone())
                })?,
        };

        tx.commit().await.map_err(db_err)?;
        Ok(purchase)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> PaymentResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn create_user(&self, user: &NewUser) -> PaymentResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_err(e) {
            PaymentError::Conflict(_) => PaymentError::Conflict("Email already registered".into()),
            other => other,
        })?;
        Ok(row.into())
    }
}
