//! Quote handling: pricing and storing quotes, operator review, the expiry
//! sweep, and conversion of a quote into a shipment.

pub mod converter;
pub mod service;

pub use converter::{placeholder_document, ConversionOutcome, CustomerOverride, QuoteConverter};
pub use service::QuoteService;
