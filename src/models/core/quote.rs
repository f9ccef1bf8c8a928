//! # Quote Model
//!
//! Provisional, priced offer for moving one package along one route.
//!
//! ## Lifecycle
//!
//! `PENDING -> APPROVED | REJECTED`, `PENDING | APPROVED -> CONVERTED` (by the
//! quote converter only) and `PENDING | APPROVED -> EXPIRED` once `expires_at`
//! has passed. The stored [`PriceBreakdown`] keeps the tax rate and its
//! version so a historical quote stays reproducible after a rate change.
//!
//! ## Database Schema
//!
//! Maps to `courier_quotes` table; package, breakdown and contact blocks are
//! JSONB, the headline amounts are duplicated into NUMERIC columns for
//! reporting queries.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, types::Json, FromRow, PgConnection, Row};
use uuid::Uuid;

use super::contact::ContactBlock;
use super::decode_text;
use super::package::PackageSpec;
use super::route::{Modality, Route, ServiceClass};
use crate::pricing::PriceBreakdown;
use crate::state_machine::QuoteState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: Uuid,
    pub route: Route,
    pub package: PackageSpec,
    pub service_class: ServiceClass,
    pub modality: Modality,
    pub breakdown: PriceBreakdown,
    /// Tariff the breakdown was computed from
    pub tariff_id: Uuid,
    pub customer_id: Option<Uuid>,
    /// Raw contact fields captured when no customer record was referenced
    pub contact: Option<ContactBlock>,
    pub recipient: Option<ContactBlock>,
    pub status: QuoteState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub converted_shipment_id: Option<Uuid>,
}

/// Everything needed to price and store a quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuote {
    pub route: Route,
    pub package: PackageSpec,
    pub service_class: ServiceClass,
    pub modality: Modality,
    pub customer_id: Option<Uuid>,
    pub contact: Option<ContactBlock>,
    pub recipient: Option<ContactBlock>,
}

impl NewQuote {
    pub fn new(route: Route, package: PackageSpec, service_class: ServiceClass, modality: Modality) -> Self {
        Self {
            route,
            package,
            service_class,
            modality,
            customer_id: None,
            contact: None,
            recipient: None,
        }
    }

    pub fn for_customer(mut self, customer_id: Uuid) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_contact(mut self, contact: ContactBlock) -> Self {
        self.contact = Some(contact);
        self
    }

    pub fn with_recipient(mut self, recipient: ContactBlock) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Stamp pricing and timing onto a pending quote
    pub fn into_quote(
        self,
        tariff_id: Uuid,
        breakdown: PriceBreakdown,
        created_at: DateTime<Utc>,
        validity: Duration,
    ) -> Quote {
        Quote {
            quote_id: Uuid::new_v4(),
            route: self.route,
            package: self.package,
            service_class: self.service_class,
            modality: self.modality,
            breakdown,
            tariff_id,
            customer_id: self.customer_id,
            contact: self.contact,
            recipient: self.recipient,
            status: QuoteState::Pending,
            created_at,
            expires_at: created_at + validity,
            updated_at: created_at,
            converted_shipment_id: None,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Quote {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let Json(package): Json<PackageSpec> = row.try_get("package")?;
        let Json(breakdown): Json<PriceBreakdown> = row.try_get("breakdown")?;
        let contact: Option<Json<ContactBlock>> = row.try_get("contact")?;
        let recipient: Option<Json<ContactBlock>> = row.try_get("recipient")?;
        Ok(Self {
            quote_id: row.try_get("quote_id")?,
            route: Route::new(row.try_get("origin_branch_id")?, row.try_get("destination_branch_id")?),
            package,
            service_class: decode_text(row, "service_class")?,
            modality: decode_text(row, "modality")?,
            breakdown,
            tariff_id: row.try_get("tariff_id")?,
            customer_id: row.try_get("customer_id")?,
            contact: contact.map(|Json(c)| c),
            recipient: recipient.map(|Json(c)| c),
            status: decode_text(row, "status")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            updated_at: row.try_get("updated_at")?,
            converted_shipment_id: row.try_get("converted_shipment_id")?,
        })
    }
}

const QUOTE_COLUMNS: &str = "quote_id, origin_branch_id, destination_branch_id, package, service_class, \
     modality, breakdown, tariff_id, customer_id, contact, recipient, status, created_at, expires_at, \
     updated_at, converted_shipment_id";

impl Quote {
    /// Pre-tax price
    pub fn base_price(&self) -> Decimal {
        self.breakdown.subtotal
    }

    /// Tax-inclusive price
    pub fn final_price(&self) -> Decimal {
        self.breakdown.total
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Insert a quote
    pub async fn insert(conn: &mut PgConnection, quote: &Quote) -> Result<Quote, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO courier_quotes
            (quote_id, origin_branch_id, destination_branch_id, package, service_class, modality,
             breakdown, base_price, final_price, tax_rate, tax_rate_version, tariff_id, customer_id,
             contact, recipient, status, created_at, expires_at, updated_at, converted_shipment_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {QUOTE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Quote>(&sql)
            .bind(quote.quote_id)
            .bind(quote.route.origin_branch_id)
            .bind(quote.route.destination_branch_id)
            .bind(Json(&quote.package))
            .bind(quote.service_class.as_str())
            .bind(quote.modality.as_str())
            .bind(Json(&quote.breakdown))
            .bind(quote.base_price())
            .bind(quote.final_price())
            .bind(quote.breakdown.tax_rate)
            .bind(&quote.breakdown.tax_rate_version)
            .bind(quote.tariff_id)
            .bind(quote.customer_id)
            .bind(quote.contact.as_ref().map(Json))
            .bind(quote.recipient.as_ref().map(Json))
            .bind(quote.status.as_str())
            .bind(quote.created_at)
            .bind(quote.expires_at)
            .bind(quote.updated_at)
            .bind(quote.converted_shipment_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Find a quote by ID
    pub async fn find_by_id(conn: &mut PgConnection, quote_id: Uuid) -> Result<Option<Quote>, sqlx::Error> {
        let sql = format!("SELECT {QUOTE_COLUMNS} FROM courier_quotes WHERE quote_id = $1");
        sqlx::query_as::<_, Quote>(&sql)
            .bind(quote_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Find a quote by ID and lock its row for the rest of the transaction
    pub async fn find_for_update(conn: &mut PgConnection, quote_id: Uuid) -> Result<Option<Quote>, sqlx::Error> {
        let sql = format!("SELECT {QUOTE_COLUMNS} FROM courier_quotes WHERE quote_id = $1 FOR UPDATE");
        sqlx::query_as::<_, Quote>(&sql)
            .bind(quote_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Write a new status, recording the shipment when converting
    pub async fn update_status(
        conn: &mut PgConnection,
        quote_id: Uuid,
        status: QuoteState,
        converted_shipment_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<Quote, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE courier_quotes
            SET status = $2, converted_shipment_id = COALESCE($3, converted_shipment_id), updated_at = $4
            WHERE quote_id = $1
            RETURNING {QUOTE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Quote>(&sql)
            .bind(quote_id)
            .bind(status.as_str())
            .bind(converted_shipment_id)
            .bind(at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Flip every pending or approved quote past its expiry to `EXPIRED`
    pub async fn expire_stale(conn: &mut PgConnection, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE courier_quotes
            SET status = 'EXPIRED', updated_at = $1
            WHERE status IN ('PENDING', 'APPROVED') AND expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
