//! # Tariff Entry Model
//!
//! Configured price for one directed branch pair.
//!
//! ## Invariants
//!
//! - At most one active entry per `(origin, destination)` pair, enforced by a
//!   partial unique index and by [`TariffEntry::create`] deactivating the
//!   previous entry in the same transaction.
//! - `A -> B` and `B -> A` are independent entries; nothing is mirrored.
//!
//! ## Database Schema
//!
//! Maps to `courier_tariffs` table:
//! ```sql
//! CREATE TABLE courier_tariffs (
//!   tariff_id UUID PRIMARY KEY,
//!   origin_branch_id BIGINT NOT NULL,
//!   destination_branch_id BIGINT NOT NULL,
//!   base_price NUMERIC(12,2) NOT NULL,
//!   price_per_extra_kg NUMERIC(12,2) NOT NULL,
//!   included_weight_kg NUMERIC(10,3) NOT NULL,
//!   service_multipliers JSONB NOT NULL,
//!   active BOOLEAN NOT NULL,
//!   created_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, types::Json, FromRow, PgConnection, Row};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::route::{Route, ServiceClass};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffEntry {
    pub tariff_id: Uuid,
    pub origin_branch_id: i64,
    pub destination_branch_id: i64,
    pub base_price: Decimal,
    pub price_per_extra_kg: Decimal,
    /// Weight covered by the base price
    pub included_weight_kg: Decimal,
    pub service_multipliers: BTreeMap<ServiceClass, Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// New TariffEntry for creation (without generated fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTariffEntry {
    pub route: Route,
    pub base_price: Decimal,
    pub price_per_extra_kg: Decimal,
    pub included_weight_kg: Decimal,
    pub service_multipliers: BTreeMap<ServiceClass, Decimal>,
}

impl NewTariffEntry {
    pub fn into_entry(self, created_at: DateTime<Utc>) -> TariffEntry {
        TariffEntry {
            tariff_id: Uuid::new_v4(),
            origin_branch_id: self.route.origin_branch_id,
            destination_branch_id: self.route.destination_branch_id,
            base_price: self.base_price,
            price_per_extra_kg: self.price_per_extra_kg,
            included_weight_kg: self.included_weight_kg,
            service_multipliers: self.service_multipliers,
            active: true,
            created_at,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for TariffEntry {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let Json(service_multipliers): Json<BTreeMap<ServiceClass, Decimal>> =
            row.try_get("service_multipliers")?;
        Ok(Self {
            tariff_id: row.try_get("tariff_id")?,
            origin_branch_id: row.try_get("origin_branch_id")?,
            destination_branch_id: row.try_get("destination_branch_id")?,
            base_price: row.try_get("base_price")?,
            price_per_extra_kg: row.try_get("price_per_extra_kg")?,
            included_weight_kg: row.try_get("included_weight_kg")?,
            service_multipliers,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

const TARIFF_COLUMNS: &str = "tariff_id, origin_branch_id, destination_branch_id, base_price, \
     price_per_extra_kg, included_weight_kg, service_multipliers, active, created_at";

impl TariffEntry {
    pub fn route(&self) -> Route {
        Route::new(self.origin_branch_id, self.destination_branch_id)
    }

    /// Multiplier for a service class; `Standard` is 1 unless configured
    pub fn multiplier_for(&self, service_class: ServiceClass) -> Option<Decimal> {
        match self.service_multipliers.get(&service_class) {
            Some(multiplier) => Some(*multiplier),
            None if service_class == ServiceClass::Standard => Some(Decimal::ONE),
            None => None,
        }
    }

    /// Insert a tariff, retiring the currently active entry for the same
    /// directed pair. Call inside a transaction.
    pub async fn create(
        conn: &mut PgConnection,
        new_entry: NewTariffEntry,
    ) -> Result<TariffEntry, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE courier_tariffs
            SET active = false
            WHERE origin_branch_id = $1 AND destination_branch_id = $2 AND active = true
            "#,
        )
        .bind(new_entry.route.origin_branch_id)
        .bind(new_entry.route.destination_branch_id)
        .execute(&mut *conn)
        .await?;

        let sql = format!(
            r#"
            INSERT INTO courier_tariffs
            (tariff_id, origin_branch_id, destination_branch_id, base_price, price_per_extra_kg,
             included_weight_kg, service_multipliers, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, true, NOW())
            RETURNING {TARIFF_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TariffEntry>(&sql)
            .bind(Uuid::new_v4())
            .bind(new_entry.route.origin_branch_id)
            .bind(new_entry.route.destination_branch_id)
            .bind(new_entry.base_price)
            .bind(new_entry.price_per_extra_kg)
            .bind(new_entry.included_weight_kg)
            .bind(Json(&new_entry.service_multipliers))
            .fetch_one(&mut *conn)
            .await
    }

    /// Get the active entry for a directed pair
    pub async fn find_active(
        conn: &mut PgConnection,
        origin_branch_id: i64,
        destination_branch_id: i64,
    ) -> Result<Option<TariffEntry>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {TARIFF_COLUMNS}
            FROM courier_tariffs
            WHERE origin_branch_id = $1 AND destination_branch_id = $2 AND active = true
            "#
        );
        sqlx::query_as::<_, TariffEntry>(&sql)
            .bind(origin_branch_id)
            .bind(destination_branch_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Find a tariff by ID, active or not
    pub async fn find_by_id(
        conn: &mut PgConnection,
        tariff_id: Uuid,
    ) -> Result<Option<TariffEntry>, sqlx::Error> {
        let sql = format!("SELECT {TARIFF_COLUMNS} FROM courier_tariffs WHERE tariff_id = $1");
        sqlx::query_as::<_, TariffEntry>(&sql)
            .bind(tariff_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Retire a tariff; returns whether a row changed
    pub async fn deactivate(conn: &mut PgConnection, tariff_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE courier_tariffs SET active = false WHERE tariff_id = $1 AND active = true")
            .bind(tariff_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
