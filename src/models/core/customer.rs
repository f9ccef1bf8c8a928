//! # Customer Model
//!
//! Customer records as seen by the conversion flow. The customer directory is
//! an external collaborator; this model is the shape the core reads and
//! creates through it.
//!
//! `document_verified` separates "we hold a document number" from "the number
//! passed validation": conversions that cannot validate a document still
//! create the customer under a placeholder number, flagged unverified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgConnection, Row};
use std::fmt;
use uuid::Uuid;

use super::contact::ContactBlock;
use crate::error::CourierError;

/// National identity and tax document kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    /// National identity card, 8 digits
    Dni,
    /// Taxpayer registry number, 11 digits with check digit
    Ruc,
    /// Foreigner card
    ForeignerCard,
    Passport,
    /// Internally generated stand-in for an unusable document
    Placeholder,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dni => "DNI",
            Self::Ruc => "RUC",
            Self::ForeignerCard => "FOREIGNER_CARD",
            Self::Passport => "PASSPORT",
            Self::Placeholder => "PLACEHOLDER",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DNI" => Ok(Self::Dni),
            "RUC" => Ok(Self::Ruc),
            "FOREIGNER_CARD" | "CE" => Ok(Self::ForeignerCard),
            "PASSPORT" => Ok(Self::Passport),
            "PLACEHOLDER" => Ok(Self::Placeholder),
            _ => Err(CourierError::validation(
                "document_type",
                format!("unknown document type: {s}"),
            )),
        }
    }
}

/// Maps to `courier_customers` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: Uuid,
    pub document_type: DocumentType,
    pub document_number: String,
    pub document_verified: bool,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New Customer for creation (without generated fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub document_type: DocumentType,
    pub document_number: String,
    pub document_verified: bool,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl NewCustomer {
    pub fn into_customer(self, created_at: DateTime<Utc>) -> Customer {
        Customer {
            customer_id: Uuid::new_v4(),
            document_type: self.document_type,
            document_number: self.document_number,
            document_verified: self.document_verified,
            name: self.name,
            phone: self.phone,
            email: self.email,
            address: self.address,
            created_at,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Customer {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let document_type: String = row.try_get("document_type")?;
        Ok(Self {
            customer_id: row.try_get("customer_id")?,
            document_type: document_type
                .parse()
                .map_err(|e: CourierError| sqlx::Error::Decode(e.to_string().into()))?,
            document_number: row.try_get("document_number")?,
            document_verified: row.try_get("document_verified")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            address: row.try_get("address")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Customer {
    /// Contact block used as the shipment sender
    pub fn contact_block(&self) -> ContactBlock {
        ContactBlock {
            name: Some(self.name.clone()),
            phone: self.phone.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            district_code: None,
            geo: None,
        }
    }

    /// Create a new customer
    pub async fn create(
        conn: &mut PgConnection,
        new_customer: NewCustomer,
    ) -> Result<Customer, sqlx::Error> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO courier_customers
            (customer_id, document_type, document_number, document_verified, name, phone, email, address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING customer_id, document_type, document_number, document_verified,
                      name, phone, email, address, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_customer.document_type.as_str())
        .bind(&new_customer.document_number)
        .bind(new_customer.document_verified)
        .bind(&new_customer.name)
        .bind(&new_customer.phone)
        .bind(&new_customer.email)
        .bind(&new_customer.address)
        .fetch_one(&mut *conn)
        .await
    }

    /// Find a customer by ID
    pub async fn find_by_id(
        conn: &mut PgConnection,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, sqlx::Error> {
        sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, document_type, document_number, document_verified,
                   name, phone, email, address, created_at
            FROM courier_customers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Find a customer by national document number
    pub async fn find_by_document(
        conn: &mut PgConnection,
        document_number: &str,
    ) -> Result<Option<Customer>, sqlx::Error> {
        sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, document_type, document_number, document_verified,
                   name, phone, email, address, created_at
            FROM courier_customers
            WHERE document_number = $1
            "#,
        )
        .bind(document_number)
        .fetch_optional(&mut *conn)
        .await
    }
}
