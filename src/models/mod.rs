//! # Models
//!
//! Data layer of the courier core. Models own their SQL; the store
//! implementations in [`crate::database`] compose them into atomic units.

pub mod core;

pub use self::core::{
    BillingBlock, Branch, ContactBlock, Customer, DocumentType, GeoStamp, Modality, NewCustomer,
    NewQuote, NewShipmentEvent, NewTariffEntry, PackageSpec, Quote, Route, ServiceClass, Shipment,
    ShipmentDraft, ShipmentEvent, TariffEntry,
};
