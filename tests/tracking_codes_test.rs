//! Tracking-code uniqueness under collisions and concurrency.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{tracking_config, Harness};
use courier_core::database::{InMemoryStore, ShipmentStore, StatusChange, StoreError, StoreResult};
use courier_core::events::EventPublisher;
use courier_core::lifecycle::ShipmentLifecycle;
use courier_core::models::{NewShipmentEvent, Shipment, ShipmentEvent};
use courier_core::tracking::is_well_formed;
use courier_core::{CourierError, ShipmentState};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Delegating store that reports a tracking-code collision on the first
/// `collisions` inserts
struct FlakyCodeStore {
    inner: Arc<InMemoryStore>,
    collisions: u32,
    attempts: AtomicU32,
}

impl FlakyCodeStore {
    fn new(inner: Arc<InMemoryStore>, collisions: u32) -> Self {
        Self {
            inner,
            collisions,
            attempts: AtomicU32::new(0),
        }
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn collide(&self) -> Option<StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        (attempt < self.collisions).then(|| StoreError::UniqueViolation {
            constraint: "courier_shipments_tracking_code_key".to_string(),
        })
    }
}

#[async_trait]
impl ShipmentStore for FlakyCodeStore {
    async fn insert_shipment_with_event(
        &self,
        shipment: Shipment,
        event: NewShipmentEvent,
    ) -> StoreResult<(Shipment, ShipmentEvent)> {
        if let Some(err) = self.collide() {
            return Err(err);
        }
        self.inner.insert_shipment_with_event(shipment, event).await
    }

    async fn commit_conversion(
        &self,
        quote_id: Uuid,
        shipment: Shipment,
        event: NewShipmentEvent,
    ) -> StoreResult<(Shipment, ShipmentEvent)> {
        if let Some(err) = self.collide() {
            return Err(err);
        }
        self.inner.commit_conversion(quote_id, shipment, event).await
    }

    async fn apply_status_change(
        &self,
        shipment_id: Uuid,
        change: StatusChange,
    ) -> StoreResult<(Shipment, ShipmentEvent)> {
        self.inner.apply_status_change(shipment_id, change).await
    }

    async fn find_shipment(&self, shipment_id: Uuid) -> StoreResult<Option<Shipment>> {
        self.inner.find_shipment(shipment_id).await
    }

    async fn find_by_tracking_code(&self, tracking_code: &str) -> StoreResult<Option<Shipment>> {
        self.inner.find_by_tracking_code(tracking_code).await
    }

    async fn list_events(&self, shipment_id: Uuid) -> StoreResult<Vec<ShipmentEvent>> {
        self.inner.list_events(shipment_id).await
    }

    async fn soft_delete_shipment(&self, shipment_id: Uuid, at: DateTime<Utc>) -> StoreResult<Shipment> {
        self.inner.soft_delete_shipment(shipment_id, at).await
    }

    async fn status_counts(&self) -> StoreResult<BTreeMap<ShipmentState, i64>> {
        self.inner.status_counts().await
    }

    async fn revenue(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> StoreResult<Decimal> {
        self.inner.revenue(from, to).await
    }
}

#[tokio::test]
async fn test_collisions_are_retried_with_a_new_code() {
    let harness = Harness::new().await;
    let flaky = Arc::new(FlakyCodeStore::new(harness.store.clone(), 2));
    let lifecycle = ShipmentLifecycle::new(
        flaky.clone(),
        harness.store.clone(),
        harness.store.clone(),
        &tracking_config(5),
        EventPublisher::default(),
    );
    let customer = harness.customer("45678912").await;

    let shipment = lifecycle
        .create(harness.draft(customer.customer_id, dec!(1)))
        .await
        .unwrap();

    assert_eq!(flaky.attempts(), 3);
    assert!(is_well_formed(&shipment.tracking_code));
    assert_eq!(harness.store.shipment_count(), 1);
    assert_eq!(lifecycle.history(shipment.shipment_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_persistent_collisions_exhaust_the_attempt_budget() {
    let harness = Harness::new().await;
    let flaky = Arc::new(FlakyCodeStore::new(harness.store.clone(), u32::MAX));
    let lifecycle = ShipmentLifecycle::new(
        flaky.clone(),
        harness.store.clone(),
        harness.store.clone(),
        &tracking_config(5),
        EventPublisher::default(),
    );
    let customer = harness.customer("45678912").await;

    let err = lifecycle
        .create(harness.draft(customer.customer_id, dec!(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, CourierError::CodeGenerationExhausted { attempts: 5 }));
    assert_eq!(flaky.attempts(), 5);
    assert_eq!(harness.store.shipment_count(), 0);
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_codes() {
    let harness = Harness::new().await;
    let customer = harness.customer("45678912").await;

    let creates = (0..50).map(|_| {
        let lifecycle = harness.lifecycle.clone();
        let draft = harness.draft(customer.customer_id, dec!(1));
        tokio::spawn(async move { lifecycle.create(draft).await })
    });
    let shipments: Vec<Shipment> = join_all(creates)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let codes: HashSet<&str> = shipments.iter().map(|s| s.tracking_code.as_str()).collect();
    assert_eq!(codes.len(), 50);
    assert_eq!(harness.store.shipment_count(), 50);
    for shipment in &shipments {
        let found = harness
            .lifecycle
            .find_by_tracking_code(&shipment.tracking_code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.shipment_id, shipment.shipment_id);
    }
}
