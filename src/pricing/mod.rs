//! # Pricing
//!
//! Tariff resolution and the quotation arithmetic. Everything here is
//! deterministic: the same route, package and service class against the same
//! tariff and tax policy always produce the same [`PriceBreakdown`].

pub mod breakdown;
pub mod engine;
pub mod tariff_resolver;

pub use breakdown::{round_money, PriceBreakdown};
pub use engine::{PricedQuote, QuotationEngine, TaxPolicy};
pub use tariff_resolver::TariffResolver;
