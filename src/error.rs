//! Error types for the quotation and shipment lifecycle engine.
//!
//! Every failure carries enough structure (which field, which precondition,
//! which route) for the caller to either fix its input or escalate. The one
//! outcome that is deliberately *not* an error is a conversion that needs
//! more customer data; see [`crate::quotes::ConversionOutcome`].

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigurationError;
use crate::database::StoreError;
use crate::state_machine::{QuoteState, ShipmentState};

#[derive(Debug, Error)]
pub enum CourierError {
    /// Bad input shape, rejected before any lookup
    #[error("Validation error on {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Missing pricing data for a route, surfaced verbatim to the operator
    #[error("No tariff configured for route {origin} -> {destination}: {detail}")]
    NoTariffConfigured {
        origin: i64,
        destination: i64,
        detail: String,
    },

    #[error("Branch {0} not found")]
    BranchNotFound(i64),

    #[error("Quote {0} not found")]
    QuoteNotFound(Uuid),

    #[error("Shipment {0} not found")]
    ShipmentNotFound(Uuid),

    #[error("Customer {0} not found")]
    CustomerNotFound(Uuid),

    #[error("Quote {quote_id} is in state {current}, expected one of {expected:?}")]
    InvalidQuoteState {
        quote_id: Uuid,
        current: QuoteState,
        expected: Vec<QuoteState>,
    },

    #[error("Quote {quote_id} expired at {expired_at}")]
    QuoteExpired {
        quote_id: Uuid,
        expired_at: DateTime<Utc>,
    },

    /// Fatal after the bounded unique-violation retry loop gives up
    #[error("Tracking code generation exhausted after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },

    #[error("Shipment {shipment_id} cannot be assigned while {current}")]
    InvalidStateForAssignment {
        shipment_id: Uuid,
        current: ShipmentState,
    },

    #[error("Shipment {shipment_id} cannot change state: {reason}")]
    InvalidStateTransition { shipment_id: Uuid, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CourierError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can fix the failure by changing its input
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::BranchNotFound(_))
    }
}

impl From<ConfigurationError> for CourierError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CourierError>;
