//! # PostgreSQL Store
//!
//! sqlx-backed implementation of the storage traits and collaborators. Every
//! multi-record operation runs in one transaction and locks the parent row
//! (`FOR UPDATE`) before reading anything it will write back, so concurrent
//! status changes on the same shipment serialize and event sort keys stay
//! gap-free. Dropping an uncommitted transaction rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::BTreeMap;
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

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Insert a registered shipment and its first event on an open transaction
async fn insert_with_first_event(
    conn: &mut sqlx::PgConnection,
    mut shipment: Shipment,
    event: NewShipmentEvent,
) -> StoreResult<(Shipment, ShipmentEvent)> {
    shipment.apply_status(event.status, event.occurred_at);
    shipment.updated_at = shipment.created_at.max(event.occurred_at);
    let shipment = Shipment::insert(&mut *conn, &shipment).await?;
    let event = ShipmentEvent::append(&mut *conn, shipment.shipment_id, event).await?;
    Ok((shipment, event))
}

#[async_trait]
impl TariffStore for PgStore {
    async fn find_active_tariff(
        &self,
        origin_branch_id: i64,
        destination_branch_id: i64,
    ) -> StoreResult<Option<TariffEntry>> {
        let mut conn = self.pool.acquire().await?;
        Ok(TariffEntry::find_active(&mut conn, origin_branch_id, destination_branch_id).await?)
    }

    async fn find_tariff(&self, tariff_id: Uuid) -> StoreResult<Option<TariffEntry>> {
        let mut conn = self.pool.acquire().await?;
        Ok(TariffEntry::find_by_id(&mut conn, tariff_id).await?)
    }

    async fn save_tariff(&self, entry: NewTariffEntry) -> StoreResult<TariffEntry> {
        let mut tx = self.pool.begin().await?;
        let entry = TariffEntry::create(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn deactivate_tariff(&self, tariff_id: Uuid) -> StoreResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(TariffEntry::deactivate(&mut conn, tariff_id).await?)
    }
}

#[async_trait]
impl QuoteStore for PgStore {
    async fn insert_quote(&self, quote: Quote) -> StoreResult<Quote> {
        let mut conn = self.pool.acquire().await?;
        Ok(Quote::insert(&mut conn, &quote).await?)
    }

    async fn find_quote(&self, quote_id: Uuid) -> StoreResult<Option<Quote>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Quote::find_by_id(&mut conn, quote_id).await?)
    }

    async fn update_quote_status(
        &self,
        quote_id: Uuid,
        from: &[QuoteState],
        to: QuoteState,
        at: DateTime<Utc>,
    ) -> StoreResult<Quote> {
        let mut tx = self.pool.begin().await?;
        let quote = Quote::find_for_update(&mut tx, quote_id)
            .await?
            .ok_or_else(|| StoreError::not_found("quote", quote_id))?;
        if !from.contains(&quote.status) {
            return Err(StoreError::StateConflict {
                entity_id: quote_id.to_string(),
                current: quote.status.to_string(),
            });
        }
        let quote = Quote::update_status(&mut tx, quote_id, to, None, at).await?;
        tx.commit().await?;
        Ok(quote)
    }

    async fn expire_quotes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Ok(Quote::expire_stale(&mut conn, now).await?)
    }
}

#[async_trait]
impl ShipmentStore for PgStore {
    async fn insert_shipment_with_event(
        &self,
        shipment: Shipment,
        event: NewShipmentEvent,
    ) -> StoreResult<(Shipment, ShipmentEvent)> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_with_first_event(&mut tx, shipment, event).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn commit_conversion(
        &self,
        quote_id: Uuid,
        shipment: Shipment,
        event: NewShipmentEvent,
    ) -> StoreResult<(Shipment, ShipmentEvent)> {
        let mut tx = self.pool.begin().await?;
        let quote = Quote::find_for_update(&mut tx, quote_id)
            .await?
            .ok_or_else(|| StoreError::not_found("quote", quote_id))?;
        if !status_groups::CONVERTIBLE_QUOTES.contains(&quote.status) {
            return Err(StoreError::StateConflict {
                entity_id: quote_id.to_string(),
                current: quote.status.to_string(),
            });
        }
        if quote.is_expired_at(shipment.created_at) {
            return Err(StoreError::QuoteExpired {
                quote_id,
                expired_at: quote.expires_at,
            });
        }

        let (shipment, event) = insert_with_first_event(&mut tx, shipment, event).await?;
        Quote::update_status(
            &mut tx,
            quote_id,
            QuoteState::Converted,
            Some(shipment.shipment_id),
            shipment.created_at,
        )
        .await?;
        tx.commit().await?;
        Ok((shipment, event))
    }

    async fn apply_status_change(
        &self,
        shipment_id: Uuid,
        change: StatusChange,
    ) -> StoreResult<(Shipment, ShipmentEvent)> {
        let mut tx = self.pool.begin().await?;
        let mut shipment = Shipment::find_for_update(&mut tx, shipment_id)
            .await?
            .ok_or_else(|| StoreError::not_found("shipment", shipment_id))?;
        if shipment.is_deleted() {
            return Err(StoreError::StateConflict {
                entity_id: shipment_id.to_string(),
                current: "DELETED".to_string(),
            });
        }
        if let Some(allowed) = &change.allowed_from {
            if !allowed.contains(&shipment.status) {
                return Err(StoreError::StateConflict {
                    entity_id: shipment_id.to_string(),
                    current: shipment.status.to_string(),
                });
            }
        }

        let event = ShipmentEvent::append(&mut tx, shipment_id, change.event).await?;
        shipment.apply_status(change.status, event.occurred_at);
        if let Some(handler_id) = change.handler_id {
            shipment.handler_id = Some(handler_id);
        }
        let shipment = Shipment::save_state(&mut tx, &shipment).await?;
        tx.commit().await?;
        Ok((shipment, event))
    }

    async fn find_shipment(&self, shipment_id: Uuid) -> StoreResult<Option<Shipment>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Shipment::find_by_id(&mut conn, shipment_id).await?)
    }

    async fn find_by_tracking_code(&self, tracking_code: &str) -> StoreResult<Option<Shipment>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Shipment::find_by_tracking_code(&mut conn, tracking_code).await?)
    }

    async fn list_events(&self, shipment_id: Uuid) -> StoreResult<Vec<ShipmentEvent>> {
        let mut conn = self.pool.acquire().await?;
        Ok(ShipmentEvent::list_for_shipment(&mut conn, shipment_id).await?)
    }

    async fn soft_delete_shipment(&self, shipment_id: Uuid, at: DateTime<Utc>) -> StoreResult<Shipment> {
        let mut tx = self.pool.begin().await?;
        let mut shipment = Shipment::find_for_update(&mut tx, shipment_id)
            .await?
            .ok_or_else(|| StoreError::not_found("shipment", shipment_id))?;
        if shipment.deleted_at.is_none() {
            shipment.deleted_at = Some(at);
            shipment.updated_at = at;
            shipment = Shipment::save_state(&mut tx, &shipment).await?;
        }
        tx.commit().await?;
        Ok(shipment)
    }

    async fn status_counts(&self) -> StoreResult<BTreeMap<ShipmentState, i64>> {
        let mut conn = self.pool.acquire().await?;
        let rows = Shipment::status_counts(&mut conn).await?;
        let mut counts = BTreeMap::new();
        for (status, count) in rows {
            let status = status
                .parse::<ShipmentState>()
                .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.to_string().into())))?;
            counts.insert(status, count);
        }
        Ok(counts)
    }

    async fn revenue(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> StoreResult<Decimal> {
        let mut conn = self.pool.acquire().await?;
        Ok(Shipment::revenue(&mut conn, from, to).await?)
    }
}

#[async_trait]
impl BranchRegistry for PgStore {
    async fn get_branch(&self, branch_id: i64) -> StoreResult<Option<Branch>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Branch::find_by_id(&mut conn, branch_id).await?)
    }
}

#[async_trait]
impl CustomerDirectory for PgStore {
    async fn find_by_document(&self, document_number: &str) -> StoreResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Customer::find_by_document(&mut conn, document_number).await?)
    }

    async fn find_customer(&self, customer_id: Uuid) -> StoreResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Ok(Customer::find_by_id(&mut conn, customer_id).await?)
    }

    async fn create_customer(&self, customer: NewCustomer) -> StoreResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        Ok(Customer::create(&mut conn, customer).await?)
    }
}

#[async_trait]
impl GeographyLookup for PgStore {
    async fn lookup_district(&self, district_code: &str) -> StoreResult<Option<GeoStamp>> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT district, province, department
            FROM courier_districts
            WHERE district_code = $1
            "#,
        )
        .bind(district_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(district, province, department)| GeoStamp {
            district,
            province,
            department,
        }))
    }
}
