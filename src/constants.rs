//! # System Constants
//!
//! Fiscal constants, courier-industry conventions, and status groupings that
//! define the operational boundaries of the quotation and lifecycle engine.

use rust_decimal::Decimal;

use crate::state_machine::{QuoteState, ShipmentState};

/// IGV (general sales tax) rate applied to every quote subtotal
pub const IGV_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Version tag stored alongside quotes priced with [`IGV_RATE`]
pub const IGV_RATE_VERSION: &str = "IGV-2011";

/// cm³ per kg used to turn package volume into volumetric weight
pub const VOLUMETRIC_DIVISOR: Decimal = Decimal::from_parts(6000, 0, 0, false, 0);

/// No package is billed below this weight
pub const MINIMUM_BILLABLE_WEIGHT_KG: Decimal = Decimal::ONE;

/// Weight included in a tariff's base price unless the tariff says otherwise
pub const DEFAULT_INCLUDED_WEIGHT_KG: Decimal = Decimal::ONE;

/// Insurance surcharge as a fraction of declared value
pub const DEFAULT_INSURANCE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Heaviest parcel accepted for pricing
pub const MAX_PACKAGE_WEIGHT_KG: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Longest side accepted for pricing
pub const MAX_PACKAGE_SIDE_CM: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Largest declared value accepted for insurance
pub const MAX_DECLARED_VALUE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Longest quote lifetime a configuration may ask for
pub const MAX_QUOTE_VALIDITY_DAYS: i64 = 365;

/// Decimal places kept on money amounts
pub const MONEY_SCALE: u32 = 2;

/// Bound on tracking-code generate+insert attempts
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// Tracking-code prefix for branches whose locality yields no usable letters
pub const FALLBACK_TRACKING_PREFIX: &str = "UNK";

/// Default quote lifetime
pub const QUOTE_VALIDITY_DAYS: i64 = 7;

/// Lifecycle notifications published for integration consumers
pub mod events {
    pub const SHIPMENT_REGISTERED: &str = "shipment.registered";
    pub const SHIPMENT_STATUS_CHANGED: &str = "shipment.status_changed";
    pub const SHIPMENT_ASSIGNED: &str = "shipment.assigned";
    pub const SHIPMENT_DELETED: &str = "shipment.deleted";

    pub const QUOTE_CREATED: &str = "quote.created";
    pub const QUOTE_APPROVED: &str = "quote.approved";
    pub const QUOTE_REJECTED: &str = "quote.rejected";
    pub const QUOTE_EXPIRED: &str = "quote.expired";
    pub const QUOTE_CONVERTED: &str = "quote.converted";
}

/// State groupings used by guards and reporting
pub mod status_groups {
    use super::{QuoteState, ShipmentState};

    /// Shipment states from which a handler may be assigned
    pub const ASSIGNABLE: &[ShipmentState] = &[ShipmentState::Registered, ShipmentState::InWarehouse];

    /// Shipment states with no further forward progress
    pub const TERMINAL: &[ShipmentState] = &[
        ShipmentState::Delivered,
        ShipmentState::Returned,
        ShipmentState::Cancelled,
    ];

    /// Quote states that may still be converted into a shipment
    pub const CONVERTIBLE_QUOTES: &[QuoteState] = &[QuoteState::Pending, QuoteState::Approved];

    /// Quote states an operator may still approve or reject
    pub const REVIEWABLE_QUOTES: &[QuoteState] = &[QuoteState::Pending];
}
