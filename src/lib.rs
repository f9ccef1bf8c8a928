#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Courier Core
//!
//! Quotation and shipment lifecycle engine for a parcel-courier back-office.
//!
//! ## Overview
//!
//! The crate prices parcels from branch-pair tariffs, stores provisional
//! quotes, converts them into shipments and tracks every shipment through its
//! delivery lifecycle with an append-only event log. Rendering, access control
//! and the customer and branch directories live elsewhere; the core reaches
//! them through the traits in [`collaborators`].
//!
//! ## Module Organization
//!
//! - [`pricing`] - tariff resolution and the quotation arithmetic
//! - [`tracking`] - tracking-code generation
//! - [`lifecycle`] - shipment creation, transitions, assignment and history
//! - [`quotes`] - quote storage, review, expiry and conversion
//! - [`database`] - storage traits with in-memory and PostgreSQL stores
//! - [`state_machine`] - shipment and quote states, guards and transition kinds
//! - [`models`] - data layer
//! - [`config`] - configuration management
//! - [`error`] - structured error handling
//! - [`events`] - lifecycle notifications for integration consumers
//! - [`reporting`] - status counts and revenue
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_core::config::PricingConfig;
//! use courier_core::database::InMemoryStore;
//! use courier_core::models::{Modality, PackageSpec, Route, ServiceClass};
//! use courier_core::pricing::QuotationEngine;
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! # async fn example() -> courier_core::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let engine = QuotationEngine::new(store.clone(), store, PricingConfig::default());
//!
//! let breakdown = engine
//!     .quote(
//!         Route::new(1, 2),
//!         &PackageSpec::with_weight(Decimal::new(25, 1)),
//!         ServiceClass::Standard,
//!         Modality::BranchToBranch,
//!     )
//!     .await?;
//! println!("total: {}", breakdown.total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests against the in-memory store
//! ```

pub mod collaborators;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod pricing;
pub mod quotes;
pub mod reporting;
pub mod state_machine;
pub mod tracking;
pub mod validation;

pub use config::{ConfigManager, CourierConfig};
pub use error::{CourierError, Result};
pub use events::EventPublisher;
pub use lifecycle::{ShipmentLifecycle, TransitionRequest};
pub use pricing::{PriceBreakdown, QuotationEngine, TariffResolver};
pub use quotes::{ConversionOutcome, CustomerOverride, QuoteConverter, QuoteService};
pub use reporting::ShipmentReport;
pub use state_machine::{QuoteState, ShipmentState, TransitionKind};
pub use tracking::TrackingCodeGenerator;
