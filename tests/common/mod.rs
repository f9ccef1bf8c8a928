//! Shared fixtures for integration tests: an in-memory store seeded with
//! branches, districts and tariffs, and every service wired against it.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;

use courier_core::collaborators::CustomerDirectory;
use courier_core::config::{CourierConfig, TrackingConfig};
use courier_core::database::{InMemoryStore, QuoteStore, TariffStore};
use courier_core::events::EventPublisher;
use courier_core::lifecycle::ShipmentLifecycle;
use courier_core::models::{
    Branch, ContactBlock, Customer, DocumentType, GeoStamp, Modality, NewCustomer, NewQuote,
    NewTariffEntry, PackageSpec, Quote, Route, ServiceClass, ShipmentDraft, TariffEntry,
};
use courier_core::pricing::QuotationEngine;
use courier_core::quotes::{QuoteConverter, QuoteService};

pub const LIMA: i64 = 1;
pub const AREQUIPA: i64 = 2;
/// Branch whose locality has no three letters to build a prefix from
pub const KM21: i64 = 3;
/// Branch marked inactive in the registry
pub const CLOSED: i64 = 4;

pub const LIMA_DISTRICT: &str = "150101";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub config: CourierConfig,
    pub publisher: EventPublisher,
    pub engine: Arc<QuotationEngine>,
    pub quotes: Arc<QuoteService>,
    pub lifecycle: Arc<ShipmentLifecycle>,
    pub converter: QuoteConverter,
    /// Active tariff Lima -> Arequipa: base 15, 5 per extra kg, 1 kg included
    pub tariff: TariffEntry,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(seeded_store());
        let tariff = store.save_tariff(lima_arequipa_tariff()).await.unwrap();
        store
            .save_tariff(NewTariffEntry {
                route: Route::new(AREQUIPA, LIMA),
                base_price: dec!(18),
                price_per_extra_kg: dec!(6),
                included_weight_kg: dec!(1),
                service_multipliers: BTreeMap::new(),
            })
            .await
            .unwrap();

        let config = CourierConfig::default();
        let publisher = EventPublisher::new(config.events.channel_capacity);
        let engine = Arc::new(QuotationEngine::new(
            store.clone(),
            store.clone(),
            config.pricing.clone(),
        ));
        let quotes = Arc::new(QuoteService::new(
            store.clone(),
            engine.clone(),
            &config.quotes,
            publisher.clone(),
        ));
        let lifecycle = Arc::new(ShipmentLifecycle::new(
            store.clone(),
            store.clone(),
            store.clone(),
            &config.tracking,
            publisher.clone(),
        ));
        let converter = QuoteConverter::new(
            quotes.clone(),
            store.clone(),
            engine.clone(),
            lifecycle.clone(),
            publisher.clone(),
        );

        Self {
            store,
            config,
            publisher,
            engine,
            quotes,
            lifecycle,
            converter,
            tariff,
        }
    }

    pub async fn customer(&self, document_number: &str) -> Customer {
        self.store
            .create_customer(NewCustomer {
                document_type: DocumentType::Dni,
                document_number: document_number.to_string(),
                document_verified: true,
                name: "Rosa Mamani".to_string(),
                phone: Some("987654321".to_string()),
                email: Some("rosa@example.pe".to_string()),
                address: Some("Av. Abancay 123".to_string()),
            })
            .await
            .unwrap()
    }

    /// Draft priced against the Lima -> Arequipa tariff
    pub fn draft(&self, customer_id: uuid::Uuid, weight: Decimal) -> ShipmentDraft {
        let package = PackageSpec::with_weight(weight);
        let price = self
            .engine
            .compute(&self.tariff, &package, ServiceClass::Standard)
            .unwrap();
        ShipmentDraft {
            customer_id,
            quote_id: None,
            route: Route::new(LIMA, AREQUIPA),
            package,
            service_class: ServiceClass::Standard,
            modality: Modality::BranchToBranch,
            price,
            sender: ContactBlock::new("Rosa Mamani", "987654321")
                .with_address("Av. Abancay 123", Some(LIMA_DISTRICT.to_string())),
            recipient: ContactBlock::new("Luis Quispe", "+51 956 123 456"),
            pickup: None,
            billing: None,
        }
    }

    /// Insert a pending quote created at `created_at` that expires after
    /// `validity`, bypassing the service clock
    pub async fn stored_quote(&self, created_at: DateTime<Utc>, validity: Duration) -> Quote {
        let request = NewQuote::new(
            Route::new(LIMA, AREQUIPA),
            PackageSpec::with_weight(dec!(2)),
            ServiceClass::Standard,
            Modality::BranchToAddress,
        );
        let breakdown = self
            .engine
            .compute(&self.tariff, &request.package, request.service_class)
            .unwrap();
        let quote = request.into_quote(self.tariff.tariff_id, breakdown, created_at, validity);
        self.store.insert_quote(quote).await.unwrap()
    }
}

pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.add_branch(Branch::new(LIMA, "Lima - Sede Central", "Lima"));
    store.add_branch(Branch::new(AREQUIPA, "Arequipa - Cercado", "Arequipa"));
    store.add_branch(Branch::new(KM21, "Km 21 Hub", "Km 21"));
    let mut closed = Branch::new(CLOSED, "Cusco - Centro", "Cusco");
    closed.active = false;
    store.add_branch(closed);
    store.add_district(
        LIMA_DISTRICT,
        GeoStamp {
            district: "Lima".to_string(),
            province: "Lima".to_string(),
            department: "Lima".to_string(),
        },
    );
    store
}

pub fn lima_arequipa_tariff() -> NewTariffEntry {
    NewTariffEntry {
        route: Route::new(LIMA, AREQUIPA),
        base_price: dec!(15),
        price_per_extra_kg: dec!(5),
        included_weight_kg: dec!(1),
        service_multipliers: BTreeMap::from([
            (ServiceClass::Economy, dec!(0.8)),
            (ServiceClass::Express, dec!(1.5)),
        ]),
    }
}

pub fn tracking_config(max_attempts: u32) -> TrackingConfig {
    TrackingConfig {
        max_attempts,
        ..TrackingConfig::default()
    }
}
