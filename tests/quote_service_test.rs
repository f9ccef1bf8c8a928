//! Quote creation, operator review and the expiry sweep.

mod common;

use chrono::{Duration, Utc};
use common::{Harness, AREQUIPA, KM21, LIMA};
use courier_core::constants::events;
use courier_core::models::{ContactBlock, Modality, NewQuote, PackageSpec, Route, ServiceClass};
use courier_core::{CourierError, QuoteState};
use rust_decimal_macros::dec;

fn lima_arequipa(weight: rust_decimal::Decimal) -> NewQuote {
    NewQuote::new(
        Route::new(LIMA, AREQUIPA),
        PackageSpec::with_weight(weight),
        ServiceClass::Standard,
        Modality::BranchToBranch,
    )
}

#[tokio::test]
async fn test_create_quote_stores_a_pending_priced_offer() {
    let harness = Harness::new().await;
    let mut receiver = harness.publisher.subscribe();
    let before = Utc::now();

    let quote = harness.quotes.create_quote(lima_arequipa(dec!(3))).await.unwrap();

    assert_eq!(quote.status, QuoteState::Pending);
    assert_eq!(quote.tariff_id, harness.tariff.tariff_id);
    assert_eq!(quote.base_price(), dec!(25.00));
    assert_eq!(quote.final_price(), dec!(29.50));
    assert_eq!(quote.expires_at - quote.created_at, Duration::days(harness.config.quotes.validity_days));
    assert!(quote.created_at >= before);

    let stored = harness.quotes.find(quote.quote_id).await.unwrap();
    assert_eq!(stored, quote);

    let published = receiver.try_recv().unwrap();
    assert_eq!(published.name, events::QUOTE_CREATED);
}

#[tokio::test]
async fn test_create_quote_without_tariff_stores_nothing() {
    let harness = Harness::new().await;
    let mut request = lima_arequipa(dec!(1));
    request.route = Route::new(LIMA, KM21);

    let err = harness.quotes.create_quote(request).await.unwrap_err();
    assert!(matches!(err, CourierError::NoTariffConfigured { .. }));
}

#[tokio::test]
async fn test_create_quote_validates_contacts() {
    let harness = Harness::new().await;
    let request = lima_arequipa(dec!(1))
        .with_contact(ContactBlock::new("Ana", "987654321").with_email("ana-at-example"));

    let err = harness.quotes.create_quote(request).await.unwrap_err();
    assert!(matches!(err, CourierError::Validation { ref field, .. } if field == "contact.email"));
}

#[tokio::test]
async fn test_review_only_applies_to_pending_quotes() {
    let harness = Harness::new().await;
    let quote = harness.quotes.create_quote(lima_arequipa(dec!(1))).await.unwrap();

    let approved = harness.quotes.approve(quote.quote_id).await.unwrap();
    assert_eq!(approved.status, QuoteState::Approved);

    let err = harness.quotes.reject(quote.quote_id).await.unwrap_err();
    assert!(matches!(
        err,
        CourierError::InvalidQuoteState { current: QuoteState::Approved, .. }
    ));
}

#[tokio::test]
async fn test_expired_quote_cannot_be_reviewed() {
    let harness = Harness::new().await;
    let quote = harness
        .stored_quote(Utc::now() - Duration::days(10), Duration::days(7))
        .await;

    let err = harness.quotes.approve(quote.quote_id).await.unwrap_err();
    assert!(matches!(err, CourierError::QuoteExpired { .. }));
}

#[tokio::test]
async fn test_expire_stale_only_touches_open_quotes_past_expiry() {
    let harness = Harness::new().await;
    let now = Utc::now();
    let stale_pending = harness.stored_quote(now - Duration::days(10), Duration::days(7)).await;
    let stale_approved = harness.stored_quote(now - Duration::days(6), Duration::days(7)).await;
    harness.quotes.approve(stale_approved.quote_id).await.unwrap();
    let stale_rejected = harness.stored_quote(now - Duration::days(6), Duration::days(7)).await;
    harness.quotes.reject(stale_rejected.quote_id).await.unwrap();
    let fresh = harness.stored_quote(now, Duration::days(7)).await;

    // Two days later the approved one has lapsed as well
    let expired = harness.quotes.expire_stale(now + Duration::days(2)).await.unwrap();
    assert_eq!(expired, 2);

    let status = |id| {
        let quotes = harness.quotes.clone();
        async move { quotes.find(id).await.unwrap().status }
    };
    assert_eq!(status(stale_pending.quote_id).await, QuoteState::Expired);
    assert_eq!(status(stale_approved.quote_id).await, QuoteState::Expired);
    assert_eq!(status(stale_rejected.quote_id).await, QuoteState::Rejected);
    assert_eq!(status(fresh.quote_id).await, QuoteState::Pending);

    assert_eq!(harness.quotes.expire_stale(now + Duration::days(2)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_quote_is_not_found() {
    let harness = Harness::new().await;
    let id = uuid::Uuid::new_v4();
    assert!(matches!(
        harness.quotes.approve(id).await.unwrap_err(),
        CourierError::QuoteNotFound(missing) if missing == id
    ));
}
