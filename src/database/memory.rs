//! # In-Memory Store
//!
//! Process-local implementation of every storage trait and collaborator,
//! used by tests and by embedders that do not run PostgreSQL.
//!
//! Transactional tables live behind one `parking_lot::RwLock`, so each trait
//! method that writes holds the write lock for its whole atomic unit and
//! validates everything before mutating anything. Reference data owned by
//! other systems (branches, districts) sits in `DashMap`s.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use super::store::{QuoteStore, ShipmentStore, StatusChange, TariffStore};
use crate::collaborators::{BranchRegistry, CustomerDirectory, GeographyLookup};
use crate::constants::status_groups;
use crate::models::{
    Branch, Customer, GeoStamp, NewCustomer, NewShipmentEvent, NewTariffEntry, Quote, Shipment,
    ShipmentEvent, TariffEntry,
};
use crate::state_machine::{QuoteState, ShipmentState};

const TRACKING_CODE_CONSTRAINT: &str = "courier_shipments_tracking_code_key";
const CUSTOMER_DOCUMENT_CONSTRAINT: &str = "courier_customers_document_number_key";

#[derive(Debug, Default)]
struct Tables {
    tariffs: HashMap<Uuid, TariffEntry>,
    quotes: HashMap<Uuid, Quote>,
    shipments: HashMap<Uuid, Shipment>,
    tracking_codes: HashMap<String, Uuid>,
    events: HashMap<Uuid, Vec<ShipmentEvent>>,
    customers: HashMap<Uuid, Customer>,
    customer_documents: HashMap<String, Uuid>,
}

impl Tables {
    fn ensure_code_available(&self, tracking_code: &str) -> StoreResult<()> {
        if self.tracking_codes.contains_key(tracking_code) {
            return Err(StoreError::UniqueViolation {
                constraint: TRACKING_CODE_CONSTRAINT.to_string(),
            });
        }
        Ok(())
    }

    fn append_event(&mut self, shipment_id: Uuid, new_event: NewShipmentEvent) -> ShipmentEvent {
        let history = self.events.entry(shipment_id).or_default();
        let (sort_key, from_status, last_occurred_at) = match history.last() {
            Some(last) => (last.sort_key + 1, Some(last.status), Some(last.occurred_at)),
            None => (1, None, None),
        };
        let event = new_event.into_event(shipment_id, sort_key, from_status, last_occurred_at);
        history.push(event.clone());
        event
    }

    /// Caller has already checked the tracking code
    fn insert_shipment(&mut self, mut shipment: Shipment, event: NewShipmentEvent) -> (Shipment, ShipmentEvent) {
        let shipment_id = shipment.shipment_id;
        let event = self.append_event(shipment_id, event);
        shipment.apply_status(event.status, event.occurred_at);
        shipment.updated_at = shipment.created_at.max(event.occurred_at);
        self.tracking_codes
            .insert(shipment.tracking_code.clone(), shipment_id);
        self.shipments.insert(shipment_id, shipment.clone());
        (shipment, event)
    }
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    branches: DashMap<i64, Branch>,
    districts: DashMap<String, GeoStamp>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a branch as if the branch registry owned it
    pub fn add_branch(&self, branch: Branch) {
        self.branches.insert(branch.branch_id, branch);
    }

    /// Register a district for geography stamping
    pub fn add_district(&self, district_code: impl Into<String>, geo: GeoStamp) {
        self.districts.insert(district_code.into(), geo);
    }

    pub fn customer_count(&self) -> usize {
        self.tables.read().customers.len()
    }

    pub fn shipment_count(&self) -> usize {
        self.tables.read().shipments.len()
    }
}

#[async_trait]
impl TariffStore for InMemoryStore {
    async fn find_active_tariff(
        &self,
        origin_branch_id: i64,
        destination_branch_id: i64,
    ) -> StoreResult<Option<TariffEntry>> {
        let tables = self.tables.read();
        Ok(tables
            .tariffs
            .values()
            .find(|t| {
                t.active
                    && t.origin_branch_id == origin_branch_id
                    && t.destination_branch_id == destination_branch_id
            })
            .cloned())
    }

    async fn find_tariff(&self, tariff_id: Uuid) -> StoreResult<Option<TariffEntry>> {
        Ok(self.tables.read().tariffs.get(&tariff_id).cloned())
    }

    async fn save_tariff(&self, entry: NewTariffEntry) -> StoreResult<TariffEntry> {
        let mut tables = self.tables.write();
        let route = entry.route;
        for existing in tables.tariffs.values_mut() {
            if existing.active && existing.route() == route {
                existing.active = false;
            }
        }
        let entry = entry.into_entry(Utc::now());
        tables.tariffs.insert(entry.tariff_id, entry.clone());
        Ok(entry)
    }

    async fn deactivate_tariff(&self, tariff_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables.tariffs.get_mut(&tariff_id) {
            Some(entry) if entry.active => {
                entry.active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl QuoteStore for InMemoryStore {
    async fn insert_quote(&self, quote: Quote) -> StoreResult<Quote> {
        let mut tables = self.tables.write();
        if tables.quotes.contains_key(&quote.quote_id) {
            return Err(StoreError::UniqueViolation {
                constraint: "courier_quotes_pkey".to_string(),
            });
        }
        tables.quotes.insert(quote.quote_id, quote.clone());
        Ok(quote)
    }

    async fn find_quote(&self, quote_id: Uuid) -> StoreResult<Option<Quote>> {
        Ok(self.tables.read().quotes.get(&quote_id).cloned())
    }

    async fn update_quote_status(
        &self,
        quote_id: Uuid,
        from: &[QuoteState],
        to: QuoteState,
        at: DateTime<Utc>,
    ) -> StoreResult<Quote> {
        let mut tables = self.tables.write();
        let quote = tables
            .quotes
            .get_mut(&quote_id)
            .ok_or_else(|| StoreError::not_found("quote", quote_id))?;
        if !from.contains(&quote.status) {
            return Err(StoreError::StateConflict {
                entity_id: quote_id.to_string(),
                current: quote.status.to_string(),
            });
        }
        quote.status = to;
        quote.updated_at = at;
        Ok(quote.clone())
    }

    async fn expire_quotes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let mut expired = 0;
        for quote in tables.quotes.values_mut() {
            if quote.status.is_convertible() && quote.expires_at < now {
                quote.status = QuoteState::Expired;
                quote.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl ShipmentStore for InMemoryStore {
    async fn insert_shipment_with_event(
        &self,
        shipment: Shipment,
        event: NewShipmentEvent,
    ) -> StoreResult<(Shipment, ShipmentEvent)> {
        let mut tables = self.tables.write();
        tables.ensure_code_available(&shipment.tracking_code)?;
        Ok(tables.insert_shipment(shipment, event))
    }

    async fn commit_conversion(
        &self,
        quote_id: Uuid,
        shipment: Shipment,
        event: NewShipmentEvent,
    ) -> StoreResult<(Shipment, ShipmentEvent)> {
        let mut tables = self.tables.write();
        let (current, expired, expires_at) = tables
            .quotes
            .get(&quote_id)
            .map(|q| (q.status, q.is_expired_at(shipment.created_at), q.expires_at))
            .ok_or_else(|| StoreError::not_found("quote", quote_id))?;
        if !status_groups::CONVERTIBLE_QUOTES.contains(&current) {
            return Err(StoreError::StateConflict {
                entity_id: quote_id.to_string(),
                current: current.to_string(),
            });
        }
        if expired {
            return Err(StoreError::QuoteExpired {
                quote_id,
                expired_at: expires_at,
            });
        }
        tables.ensure_code_available(&shipment.tracking_code)?;

        let (shipment, event) = tables.insert_shipment(shipment, event);
        if let Some(quote) = tables.quotes.get_mut(&quote_id) {
            quote.status = QuoteState::Converted;
            quote.converted_shipment_id = Some(shipment.shipment_id);
            quote.updated_at = shipment.created_at;
        }
        Ok((shipment, event))
    }

    async fn apply_status_change(
        &self,
        shipment_id: Uuid,
        change: StatusChange,
    ) -> StoreResult<(Shipment, ShipmentEvent)> {
        let mut tables = self.tables.write();
        let current = tables
            .shipments
            .get(&shipment_id)
            .ok_or_else(|| StoreError::not_found("shipment", shipment_id))?;
        if current.is_deleted() {
            return Err(StoreError::StateConflict {
                entity_id: shipment_id.to_string(),
                current: "DELETED".to_string(),
            });
        }
        if let Some(allowed) = &change.allowed_from {
            if !allowed.contains(&current.status) {
                return Err(StoreError::StateConflict {
                    entity_id: shipment_id.to_string(),
                    current: current.status.to_string(),
                });
            }
        }

        let event = tables.append_event(shipment_id, change.event);
        let shipment = tables
            .shipments
            .get_mut(&shipment_id)
            .ok_or_else(|| StoreError::not_found("shipment", shipment_id))?;
        shipment.apply_status(change.status, event.occurred_at);
        if let Some(handler_id) = change.handler_id {
            shipment.handler_id = Some(handler_id);
        }
        Ok((shipment.clone(), event))
    }

    async fn find_shipment(&self, shipment_id: Uuid) -> StoreResult<Option<Shipment>> {
        Ok(self.tables.read().shipments.get(&shipment_id).cloned())
    }

    async fn find_by_tracking_code(&self, tracking_code: &str) -> StoreResult<Option<Shipment>> {
        let tables = self.tables.read();
        Ok(tables
            .tracking_codes
            .get(tracking_code)
            .and_then(|id| tables.shipments.get(id))
            .cloned())
    }

    async fn list_events(&self, shipment_id: Uuid) -> StoreResult<Vec<ShipmentEvent>> {
        Ok(self
            .tables
            .read()
            .events
            .get(&shipment_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn soft_delete_shipment(&self, shipment_id: Uuid, at: DateTime<Utc>) -> StoreResult<Shipment> {
        let mut tables = self.tables.write();
        let shipment = tables
            .shipments
            .get_mut(&shipment_id)
            .ok_or_else(|| StoreError::not_found("shipment", shipment_id))?;
        if shipment.deleted_at.is_none() {
            shipment.deleted_at = Some(at);
            shipment.updated_at = at;
        }
        Ok(shipment.clone())
    }

    async fn status_counts(&self) -> StoreResult<BTreeMap<ShipmentState, i64>> {
        let tables = self.tables.read();
        let mut counts = BTreeMap::new();
        for shipment in tables.shipments.values().filter(|s| !s.is_deleted()) {
            *counts.entry(shipment.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn revenue(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> StoreResult<Decimal> {
        let tables = self.tables.read();
        Ok(tables
            .shipments
            .values()
            .filter(|s| !s.is_deleted() && s.status != ShipmentState::Cancelled)
            .filter(|s| from.map_or(true, |from| s.created_at >= from))
            .filter(|s| to.map_or(true, |to| s.created_at < to))
            .map(|s| s.total_price)
            .sum())
    }
}

#[async_trait]
impl BranchRegistry for InMemoryStore {
    async fn get_branch(&self, branch_id: i64) -> StoreResult<Option<Branch>> {
        Ok(self.branches.get(&branch_id).map(|b| b.value().clone()))
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryStore {
    async fn find_by_document(&self, document_number: &str) -> StoreResult<Option<Customer>> {
        let tables = self.tables.read();
        Ok(tables
            .customer_documents
            .get(document_number)
            .and_then(|id| tables.customers.get(id))
            .cloned())
    }

    async fn find_customer(&self, customer_id: Uuid) -> StoreResult<Option<Customer>> {
        Ok(self.tables.read().customers.get(&customer_id).cloned())
    }

    async fn create_customer(&self, customer: NewCustomer) -> StoreResult<Customer> {
        let mut tables = self.tables.write();
        if tables
            .customer_documents
            .contains_key(&customer.document_number)
        {
            return Err(StoreError::UniqueViolation {
                constraint: CUSTOMER_DOCUMENT_CONSTRAINT.to_string(),
            });
        }
        let customer = customer.into_customer(Utc::now());
        tables
            .customer_documents
            .insert(customer.document_number.clone(), customer.customer_id);
        tables.customers.insert(customer.customer_id, customer.clone());
        Ok(customer)
    }
}

#[async_trait]
impl GeographyLookup for InMemoryStore {
    async fn lookup_district(&self, district_code: &str) -> StoreResult<Option<GeoStamp>> {
        Ok(self.districts.get(district_code).map(|g| g.value().clone()))
    }
}
