//! # Event Catalog
//!
//! Listing and creation of events. Visibility rules depend on whether the caller is
//! an admin; the caller's role is decided upstream and passed in.

use crate::error::{PaymentError, PaymentResult};
use crate::event::{Event, EventFilter, EventReport, NewEvent};
use crate::store::BoxedEventStore;
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

/// Query parameters of the listing call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub id: Option<String>,
    /// Admin only
    #[serde(default, rename = "ishidden", deserialize_with = "query_flag")]
    pub is_hidden: Option<bool>,
    /// Admin only
    #[serde(
        default,
        rename = "showcustomerdetails",
        deserialize_with = "query_flag"
    )]
    pub show_customer_details: Option<bool>,
}

/// `true`/`false` in any case; an empty value counts as absent.
fn query_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        Ok(None)
    } else if value.eq_ignore_ascii_case("true") {
        Ok(Some(true))
    } else if value.eq_ignore_ascii_case("false") {
        Ok(Some(false))
    } else {
        Err(de::Error::custom(format!(
            "expected `true` or `false`, got `{}`",
            value
        )))
    }
}

impl EventQuery {
    fn event_id(&self) -> PaymentResult<Option<Uuid>> {
        match self.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| PaymentError::InvalidInput(format!("Invalid event id: {}", raw))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventListing {
    Events(Vec<Event>),
    Reports(Vec<EventReport>),
}

impl EventListing {
    pub fn len(&self) -> usize {
        match self {
            EventListing::Events(events) => events.len(),
            EventListing::Reports(reports) => reports.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct EventCatalog {
    store: BoxedEventStore,
}

impl EventCatalog {
    pub fn new(store: BoxedEventStore) -> Self {
        Self { store }
    }

    /// List events newest first. Non-admins only ever see visible events and never
    /// the customer report.
    #[instrument(skip(self, query))]
    pub async fn find(&self, query: &EventQuery, is_admin: bool) -> PaymentResult<EventListing> {
        let id = query.event_id()?;

        let filter = if is_admin {
            EventFilter {
                id,
                is_hidden: query.is_hidden,
            }
        } else {
            EventFilter::public(id)
        };

        let events = self.store.list_events(&filter).await?;

        if !(is_admin && query.show_customer_details.unwrap_or(false)) {
            return Ok(EventListing::Events(events));
        }

        let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let rows = self.store.purchases_for_events(&ids).await?;
        Ok(EventListing::Reports(
            events
                .into_iter()
                .map(|event| EventReport::build(event, &rows))
                .collect(),
        ))
    }

    #[instrument(skip(self, event), fields(title = %event.title))]
    pub async fn create(&self, event: &NewEvent) -> PaymentResult<Event> {
        event.validate()?;
        let created = self.store.create_event(event).await?;
        info!(event_id = %created.id, hidden = created.is_hidden, "Event created");
        Ok(created)
    }
}
