//! # Shipment Event Model
//!
//! Append-only audit trail of shipment status changes.
//!
//! ## Overview
//!
//! Every status change, the initial registration included, writes exactly one
//! `ShipmentEvent` in the same atomic unit as the shipment update. Events are
//! never updated or deleted; the current status is the one carried by the
//! event with the highest `sort_key`.
//!
//! ## Ordering
//!
//! - `sort_key` is `MAX(sort_key) + 1` for the shipment, computed while the
//!   shipment row is locked, so keys are gap-free and unique per shipment.
//! - `occurred_at` never decreases along `sort_key`; the store clamps a
//!   requested timestamp to the last event's time.
//!
//! ## Database Schema
//!
//! Maps to `courier_shipment_events` table:
//! ```sql
//! CREATE TABLE courier_shipment_events (
//!   event_id UUID PRIMARY KEY,
//!   shipment_id UUID NOT NULL REFERENCES courier_shipments,
//!   sort_key INTEGER NOT NULL,
//!   from_status TEXT,
//!   status TEXT NOT NULL,
//!   transition_kind TEXT NOT NULL,
//!   ...
//!   UNIQUE (shipment_id, sort_key)
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgConnection, Row};
use uuid::Uuid;

use super::decode_text;
use crate::error::CourierError;
use crate::state_machine::{ShipmentState, TransitionKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentEvent {
    pub event_id: Uuid,
    pub shipment_id: Uuid,
    pub sort_key: i32,
    /// Status before this event; `None` for the registration event
    pub from_status: Option<ShipmentState>,
    pub status: ShipmentState,
    pub transition_kind: TransitionKind,
    pub description: String,
    pub location: String,
    /// Delivery evidence
    pub photo_url: Option<String>,
    pub signature_url: Option<String>,
    pub handler_id: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event content supplied by the caller. Identity, ordering and the previous
/// status are filled in by the store inside the atomic unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShipmentEvent {
    pub status: ShipmentState,
    pub description: String,
    pub location: String,
    pub photo_url: Option<String>,
    pub signature_url: Option<String>,
    pub handler_id: Option<i64>,
    /// Requested event time
    pub occurred_at: DateTime<Utc>,
}

impl NewShipmentEvent {
    pub fn new(
        status: ShipmentState,
        description: impl Into<String>,
        location: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            description: description.into(),
            location: location.into(),
            photo_url: None,
            signature_url: None,
            handler_id: None,
            occurred_at,
        }
    }

    pub fn with_evidence(mut self, photo_url: Option<String>, signature_url: Option<String>) -> Self {
        self.photo_url = photo_url;
        self.signature_url = signature_url;
        self
    }

    pub fn with_handler(mut self, handler_id: i64) -> Self {
        self.handler_id = Some(handler_id);
        self
    }

    /// Complete the event for its position in the shipment's history.
    ///
    /// `last_occurred_at` is the time of the previous event; the resulting
    /// event is never earlier than it.
    pub fn into_event(
        self,
        shipment_id: Uuid,
        sort_key: i32,
        from_status: Option<ShipmentState>,
        last_occurred_at: Option<DateTime<Utc>>,
    ) -> ShipmentEvent {
        let occurred_at = match last_occurred_at {
            Some(last) if last > self.occurred_at => last,
            _ => self.occurred_at,
        };
        ShipmentEvent {
            event_id: Uuid::new_v4(),
            shipment_id,
            sort_key,
            from_status,
            status: self.status,
            transition_kind: TransitionKind::classify(from_status, self.status),
            description: self.description,
            location: self.location,
            photo_url: self.photo_url,
            signature_url: self.signature_url,
            handler_id: self.handler_id,
            occurred_at,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for ShipmentEvent {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let from_status: Option<String> = row.try_get("from_status")?;
        let transition_kind: String = row.try_get("transition_kind")?;
        Ok(Self {
            event_id: row.try_get("event_id")?,
            shipment_id: row.try_get("shipment_id")?,
            sort_key: row.try_get("sort_key")?,
            from_status: from_status
                .map(|s| s.parse::<ShipmentState>())
                .transpose()
                .map_err(|e: CourierError| sqlx::Error::Decode(e.to_string().into()))?,
            status: decode_text(row, "status")?,
            transition_kind: transition_kind
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            photo_url: row.try_get("photo_url")?,
            signature_url: row.try_get("signature_url")?,
            handler_id: row.try_get("handler_id")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }
}

const EVENT_COLUMNS: &str = "event_id, shipment_id, sort_key, from_status, status, transition_kind, \
     description, location, photo_url, signature_url, handler_id, occurred_at";

impl ShipmentEvent {
    /// Last event of a shipment, the one carrying its current status
    pub async fn find_latest(conn: &mut PgConnection, shipment_id: Uuid) -> Result<Option<ShipmentEvent>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM courier_shipment_events
            WHERE shipment_id = $1
            ORDER BY sort_key DESC
            LIMIT 1
            "#
        );
        sqlx::query_as::<_, ShipmentEvent>(&sql)
            .bind(shipment_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Append the next event for a shipment.
    ///
    /// Must run in the transaction that locked the shipment row, which makes
    /// the `MAX(sort_key) + 1` read safe against concurrent appends.
    pub async fn append(
        conn: &mut PgConnection,
        shipment_id: Uuid,
        new_event: NewShipmentEvent,
    ) -> Result<ShipmentEvent, sqlx::Error> {
        let latest = Self::find_latest(&mut *conn, shipment_id).await?;
        let (sort_key, from_status, last_occurred_at) = match latest {
            Some(event) => (event.sort_key + 1, Some(event.status), Some(event.occurred_at)),
            None => (1, None, None),
        };
        let event = new_event.into_event(shipment_id, sort_key, from_status, last_occurred_at);

        let sql = format!(
            r#"
            INSERT INTO courier_shipment_events
            (event_id, shipment_id, sort_key, from_status, status, transition_kind, description,
             location, photo_url, signature_url, handler_id, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {EVENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ShipmentEvent>(&sql)
            .bind(event.event_id)
            .bind(event.shipment_id)
            .bind(event.sort_key)
            .bind(event.from_status.map(|s| s.as_str()))
            .bind(event.status.as_str())
            .bind(event.transition_kind.as_str())
            .bind(&event.description)
            .bind(&event.location)
            .bind(&event.photo_url)
            .bind(&event.signature_url)
            .bind(event.handler_id)
            .bind(event.occurred_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Full history in order
    pub async fn list_for_shipment(
        conn: &mut PgConnection,
        shipment_id: Uuid,
    ) -> Result<Vec<ShipmentEvent>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM courier_shipment_events
            WHERE shipment_id = $1
            ORDER BY sort_key ASC
            "#
        );
        sqlx::query_as::<_, ShipmentEvent>(&sql)
            .bind(shipment_id)
            .fetch_all(&mut *conn)
            .await
    }
}
