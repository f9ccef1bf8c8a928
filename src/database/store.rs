//! # Storage Traits
//!
//! Persistence seams of the courier core. Each method that touches more than
//! one record is a single atomic unit: implementations either apply all of
//! its writes or none of them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::error::StoreResult;
use crate::models::{NewShipmentEvent, NewTariffEntry, Quote, Shipment, ShipmentEvent, TariffEntry};
use crate::state_machine::{QuoteState, ShipmentState};

/// Tariff table access
#[async_trait]
pub trait TariffStore: Send + Sync {
    /// The active entry for a directed branch pair
    async fn find_active_tariff(&self, origin_branch_id: i64, destination_branch_id: i64)
        -> StoreResult<Option<TariffEntry>>;

    /// Any entry by id, active or retired
    async fn find_tariff(&self, tariff_id: Uuid) -> StoreResult<Option<TariffEntry>>;

    /// Store a new active entry, retiring the previous active entry for the pair
    async fn save_tariff(&self, entry: NewTariffEntry) -> StoreResult<TariffEntry>;

    /// Retire an entry; `false` when it was not active
    async fn deactivate_tariff(&self, tariff_id: Uuid) -> StoreResult<bool>;
}

/// Quote table access
#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn insert_quote(&self, quote: Quote) -> StoreResult<Quote>;

    async fn find_quote(&self, quote_id: Uuid) -> StoreResult<Option<Quote>>;

    /// Move a quote to `to` only if it is currently in one of `from`.
    /// Fails with `StateConflict` otherwise.
    async fn update_quote_status(
        &self,
        quote_id: Uuid,
        from: &[QuoteState],
        to: QuoteState,
        at: DateTime<Utc>,
    ) -> StoreResult<Quote>;

    /// Expire every pending or approved quote whose expiry is before `now`
    async fn expire_quotes(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// A status change and its event, applied together
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: ShipmentState,
    /// Handler to record on the shipment, if this change assigns one
    pub handler_id: Option<i64>,
    /// Current states the change is allowed from, checked under the row lock;
    /// `None` accepts any state
    pub allowed_from: Option<Vec<ShipmentState>>,
    pub event: NewShipmentEvent,
}

/// Shipment and shipment-event access
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Insert a registered shipment and its first event.
    /// A tracking-code collision surfaces as `UniqueViolation`.
    async fn insert_shipment_with_event(
        &self,
        shipment: Shipment,
        event: NewShipmentEvent,
    ) -> StoreResult<(Shipment, ShipmentEvent)>;

    /// Insert the shipment and its first event and flip the quote to
    /// `CONVERTED`, provided the quote is still pending or approved and had
    /// not expired when the shipment was created
    async fn commit_conversion(
        &self,
        quote_id: Uuid,
        shipment: Shipment,
        event: NewShipmentEvent,
    ) -> StoreResult<(Shipment, ShipmentEvent)>;

    /// Update status, progress, delivery time and handler and append the event.
    /// Deleted shipments fail with `StateConflict`.
    async fn apply_status_change(
        &self,
        shipment_id: Uuid,
        change: StatusChange,
    ) -> StoreResult<(Shipment, ShipmentEvent)>;

    async fn find_shipment(&self, shipment_id: Uuid) -> StoreResult<Option<Shipment>>;

    async fn find_by_tracking_code(&self, tracking_code: &str) -> StoreResult<Option<Shipment>>;

    /// Events ordered by `sort_key`
    async fn list_events(&self, shipment_id: Uuid) -> StoreResult<Vec<ShipmentEvent>>;

    /// Set the soft-delete marker; events are kept
    async fn soft_delete_shipment(&self, shipment_id: Uuid, at: DateTime<Utc>) -> StoreResult<Shipment>;

    /// Non-deleted shipments per status
    async fn status_counts(&self) -> StoreResult<BTreeMap<ShipmentState, i64>>;

    /// Total price of non-deleted, non-cancelled shipments created in `[from, to)`
    async fn revenue(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> StoreResult<Decimal>;
}
