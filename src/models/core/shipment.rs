//! # Shipment Model
//!
//! Committed shipment, owned by the shipment lifecycle once created.
//!
//! ## State Tracking
//!
//! - `status` and `progress_percentage` always move together through
//!   [`Shipment::apply_status`]; the percentage is never set on its own.
//! - `delivered_at` is set exactly when the status is `DELIVERED`.
//! - `deleted_at` is a soft-delete marker; the row and its events stay.
//!
//! ## Database Schema
//!
//! Maps to `courier_shipments` table with a unique constraint
//! `courier_shipments_tracking_code_key` on `tracking_code`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, types::Json, FromRow, PgConnection, Row};
use uuid::Uuid;

use super::contact::{BillingBlock, ContactBlock};
use super::decode_text;
use super::package::PackageSpec;
use super::route::{Modality, Route, ServiceClass};
use crate::pricing::PriceBreakdown;
use crate::state_machine::ShipmentState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_id: Uuid,
    pub tracking_code: String,
    pub customer_id: Uuid,
    /// Quote this shipment was converted from, if any
    pub quote_id: Option<Uuid>,
    pub route: Route,
    pub package: PackageSpec,
    pub service_class: ServiceClass,
    pub modality: Modality,
    pub price: PriceBreakdown,
    pub total_price: Decimal,
    pub status: ShipmentState,
    pub progress_percentage: u8,
    pub sender: ContactBlock,
    pub recipient: ContactBlock,
    pub pickup: Option<ContactBlock>,
    pub billing: Option<BillingBlock>,
    pub handler_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Shipment fields supplied by the caller; the lifecycle adds the tracking
/// code, status and timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentDraft {
    pub customer_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub route: Route,
    pub package: PackageSpec,
    pub service_class: ServiceClass,
    pub modality: Modality,
    pub price: PriceBreakdown,
    pub sender: ContactBlock,
    pub recipient: ContactBlock,
    pub pickup: Option<ContactBlock>,
    pub billing: Option<BillingBlock>,
}

impl ShipmentDraft {
    /// Registered shipment carrying the given tracking code
    pub fn into_shipment(self, shipment_id: Uuid, tracking_code: String, created_at: DateTime<Utc>) -> Shipment {
        let status = ShipmentState::Registered;
        Shipment {
            shipment_id,
            tracking_code,
            customer_id: self.customer_id,
            quote_id: self.quote_id,
            route: self.route,
            package: self.package,
            service_class: self.service_class,
            modality: self.modality,
            total_price: self.price.total,
            price: self.price,
            status,
            progress_percentage: status.progress_percentage(),
            sender: self.sender,
            recipient: self.recipient,
            pickup: self.pickup,
            billing: self.billing,
            handler_id: None,
            created_at,
            updated_at: created_at,
            delivered_at: None,
            deleted_at: None,
        }
    }
}

impl Shipment {
    /// Move to `status`, keeping progress and delivery time in lock-step
    pub fn apply_status(&mut self, status: ShipmentState, at: DateTime<Utc>) {
        self.status = status;
        self.progress_percentage = status.progress_percentage();
        self.delivered_at = (status == ShipmentState::Delivered).then_some(at);
        self.updated_at = at;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl<'r> FromRow<'r, PgRow> for Shipment {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let Json(package): Json<PackageSpec> = row.try_get("package")?;
        let Json(price): Json<PriceBreakdown> = row.try_get("price")?;
        let Json(sender): Json<ContactBlock> = row.try_get("sender")?;
        let Json(recipient): Json<ContactBlock> = row.try_get("recipient")?;
        let pickup: Option<Json<ContactBlock>> = row.try_get("pickup")?;
        let billing: Option<Json<BillingBlock>> = row.try_get("billing")?;
        let progress: i16 = row.try_get("progress_percentage")?;
        Ok(Self {
            shipment_id: row.try_get("shipment_id")?,
            tracking_code: row.try_get("tracking_code")?,
            customer_id: row.try_get("customer_id")?,
            quote_id: row.try_get("quote_id")?,
            route: Route::new(row.try_get("origin_branch_id")?, row.try_get("destination_branch_id")?),
            package,
            service_class: decode_text(row, "service_class")?,
            modality: decode_text(row, "modality")?,
            price,
            total_price: row.try_get("total_price")?,
            status: decode_text(row, "status")?,
            progress_percentage: u8::try_from(progress)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            sender,
            recipient,
            pickup: pickup.map(|Json(p)| p),
            billing: billing.map(|Json(b)| b),
            handler_id: row.try_get("handler_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            delivered_at: row.try_get("delivered_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

const SHIPMENT_COLUMNS: &str = "shipment_id, tracking_code, customer_id, quote_id, origin_branch_id, \
     destination_branch_id, package, service_class, modality, price, total_price, status, \
     progress_percentage, sender, recipient, pickup, billing, handler_id, created_at, updated_at, \
     delivered_at, deleted_at";

impl Shipment {
    /// Insert a shipment; a duplicate tracking code fails on
    /// `courier_shipments_tracking_code_key`
    pub async fn insert(conn: &mut PgConnection, shipment: &Shipment) -> Result<Shipment, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO courier_shipments
            (shipment_id, tracking_code, customer_id, quote_id, origin_branch_id, destination_branch_id,
             package, service_class, modality, price, total_price, status, progress_percentage,
             sender, recipient, pickup, billing, handler_id, created_at, updated_at, delivered_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING {SHIPMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Shipment>(&sql)
            .bind(shipment.shipment_id)
            .bind(&shipment.tracking_code)
            .bind(shipment.customer_id)
            .bind(shipment.quote_id)
            .bind(shipment.route.origin_branch_id)
            .bind(shipment.route.destination_branch_id)
            .bind(Json(&shipment.package))
            .bind(shipment.service_class.as_str())
            .bind(shipment.modality.as_str())
            .bind(Json(&shipment.price))
            .bind(shipment.total_price)
            .bind(shipment.status.as_str())
            .bind(i16::from(shipment.progress_percentage))
            .bind(Json(&shipment.sender))
            .bind(Json(&shipment.recipient))
            .bind(shipment.pickup.as_ref().map(Json))
            .bind(shipment.billing.as_ref().map(Json))
            .bind(shipment.handler_id)
            .bind(shipment.created_at)
            .bind(shipment.updated_at)
            .bind(shipment.delivered_at)
            .bind(shipment.deleted_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Find a shipment by ID
    pub async fn find_by_id(conn: &mut PgConnection, shipment_id: Uuid) -> Result<Option<Shipment>, sqlx::Error> {
        let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM courier_shipments WHERE shipment_id = $1");
        sqlx::query_as::<_, Shipment>(&sql)
            .bind(shipment_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Find a shipment by ID and lock its row for the rest of the transaction
    pub async fn find_for_update(
        conn: &mut PgConnection,
        shipment_id: Uuid,
    ) -> Result<Option<Shipment>, sqlx::Error> {
        let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM courier_shipments WHERE shipment_id = $1 FOR UPDATE");
        sqlx::query_as::<_, Shipment>(&sql)
            .bind(shipment_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Public tracking lookup
    pub async fn find_by_tracking_code(
        conn: &mut PgConnection,
        tracking_code: &str,
    ) -> Result<Option<Shipment>, sqlx::Error> {
        let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM courier_shipments WHERE tracking_code = $1");
        sqlx::query_as::<_, Shipment>(&sql)
            .bind(tracking_code)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Persist the mutable lifecycle fields of an already-updated shipment
    pub async fn save_state(conn: &mut PgConnection, shipment: &Shipment) -> Result<Shipment, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE courier_shipments
            SET status = $2, progress_percentage = $3, delivered_at = $4, handler_id = $5,
                updated_at = $6, deleted_at = $7
            WHERE shipment_id = $1
            RETURNING {SHIPMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Shipment>(&sql)
            .bind(shipment.shipment_id)
            .bind(shipment.status.as_str())
            .bind(i16::from(shipment.progress_percentage))
            .bind(shipment.delivered_at)
            .bind(shipment.handler_id)
            .bind(shipment.updated_at)
            .bind(shipment.deleted_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Count non-deleted shipments per status
    pub async fn status_counts(conn: &mut PgConnection) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*)
            FROM courier_shipments
            WHERE deleted_at IS NULL
            GROUP BY status
            "#,
        )
        .fetch_all(&mut *conn)
        .await
    }

    /// Sum of non-deleted, non-cancelled shipment totals created in `[from, to)`
    pub async fn revenue(
        conn: &mut PgConnection,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Decimal, sqlx::Error> {
        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT SUM(total_price)
            FROM courier_shipments
            WHERE deleted_at IS NULL
              AND status <> 'CANCELLED'
              AND ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at < $2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&mut *conn)
        .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }
}
