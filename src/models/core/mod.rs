//! # Core Models
//!
//! Persistent records of the courier domain together with the SQL that reads
//! and writes them. Every query takes a `&mut PgConnection` so callers decide
//! the transaction boundary.

pub mod branch;
pub mod contact;
pub mod customer;
pub mod package;
pub mod quote;
pub mod route;
pub mod shipment;
pub mod shipment_event;
pub mod tariff_entry;

use sqlx::{postgres::PgRow, Row};
use std::str::FromStr;

use crate::error::CourierError;

pub use branch::Branch;
pub use contact::{BillingBlock, ContactBlock, GeoStamp};
pub use customer::{Customer, DocumentType, NewCustomer};
pub use package::PackageSpec;
pub use quote::{NewQuote, Quote};
pub use route::{Modality, Route, ServiceClass};
pub use shipment::{Shipment, ShipmentDraft};
pub use shipment_event::{NewShipmentEvent, ShipmentEvent};
pub use tariff_entry::{NewTariffEntry, TariffEntry};

/// Decode a TEXT column into one of the domain enums
pub(crate) fn decode_text<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = CourierError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}
