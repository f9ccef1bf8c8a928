//! Quotation engine against the seeded in-memory tariff table.

mod common;

use common::{Harness, AREQUIPA, CLOSED, KM21, LIMA};
use courier_core::database::TariffStore;
use courier_core::models::{Modality, NewQuote, PackageSpec, Route, ServiceClass};
use courier_core::CourierError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_scenario_a_minimum_billable_weight() {
    let harness = Harness::new().await;
    let breakdown = harness
        .engine
        .quote(
            Route::new(LIMA, AREQUIPA),
            &PackageSpec::with_weight(dec!(0.5)),
            ServiceClass::Standard,
            Modality::BranchToBranch,
        )
        .await
        .unwrap();

    assert_eq!(breakdown.base_price, dec!(15));
    assert_eq!(breakdown.billable_weight, dec!(1));
    assert_eq!(breakdown.extra_weight, Decimal::ZERO);
    assert_eq!(breakdown.subtotal, dec!(15.00));
    assert_eq!(breakdown.tax, dec!(2.70));
    assert_eq!(breakdown.total, dec!(17.70));
}

#[tokio::test]
async fn test_scenario_b_actual_weight_beats_volumetric() {
    let harness = Harness::new().await;
    let package = PackageSpec::with_weight(dec!(3)).with_dimensions(dec!(20), dec!(20), dec!(20));
    let breakdown = harness
        .engine
        .quote(
            Route::new(LIMA, AREQUIPA),
            &package,
            ServiceClass::Standard,
            Modality::BranchToAddress,
        )
        .await
        .unwrap();

    assert_eq!(breakdown.billable_weight, dec!(3));
    assert_eq!(breakdown.extra_weight, dec!(2));
    assert_eq!(breakdown.extra_cost, dec!(10.00));
    assert_eq!(breakdown.subtotal, dec!(25.00));
    assert_eq!(breakdown.tax, dec!(4.50));
    assert_eq!(breakdown.total, dec!(29.50));
}

#[tokio::test]
async fn test_volumetric_weight_governs_bulky_parcels() {
    let harness = Harness::new().await;
    // 40 x 30 x 20 = 24000 cm3 -> 4 kg volumetric
    let package = PackageSpec::with_weight(dec!(1)).with_dimensions(dec!(40), dec!(30), dec!(20));
    let breakdown = harness
        .engine
        .quote(
            Route::new(LIMA, AREQUIPA),
            &package,
            ServiceClass::Standard,
            Modality::BranchToBranch,
        )
        .await
        .unwrap();

    assert_eq!(breakdown.volumetric_weight, dec!(4));
    assert_eq!(breakdown.billable_weight, dec!(4));
    assert_eq!(breakdown.extra_cost, dec!(15.00));
    assert_eq!(breakdown.subtotal, dec!(30.00));
    assert_eq!(breakdown.total, dec!(35.40));
}

#[tokio::test]
async fn test_service_class_multiplier_and_insurance() {
    let harness = Harness::new().await;
    let package = PackageSpec::with_weight(dec!(1)).with_declared_value(dec!(500));

    let economy = harness
        .engine
        .quote(Route::new(LIMA, AREQUIPA), &package, ServiceClass::Economy, Modality::BranchToBranch)
        .await
        .unwrap();
    // 15 * 0.8 + 500 * 0.01
    assert_eq!(economy.insurance, dec!(5.00));
    assert_eq!(economy.subtotal, dec!(17.00));
    assert_eq!(economy.tax, dec!(3.06));
    assert_eq!(economy.total, dec!(20.06));

    let express = harness
        .engine
        .quote(Route::new(LIMA, AREQUIPA), &package, ServiceClass::Express, Modality::BranchToBranch)
        .await
        .unwrap();
    assert_eq!(express.service_multiplier, dec!(1.5));
    assert_eq!(express.subtotal, dec!(27.50));
    assert_eq!(express.total, dec!(32.45));
}

#[tokio::test]
async fn test_reverse_direction_is_priced_independently() {
    let harness = Harness::new().await;
    let package = PackageSpec::with_weight(dec!(2));

    let outbound = harness
        .engine
        .quote(Route::new(LIMA, AREQUIPA), &package, ServiceClass::Standard, Modality::BranchToBranch)
        .await
        .unwrap();
    let inbound = harness
        .engine
        .quote(Route::new(AREQUIPA, LIMA), &package, ServiceClass::Standard, Modality::BranchToBranch)
        .await
        .unwrap();

    assert_eq!(outbound.subtotal, dec!(20.00));
    assert_eq!(inbound.subtotal, dec!(24.00));
}

#[tokio::test]
async fn test_identical_inputs_give_identical_breakdowns() {
    let harness = Harness::new().await;
    let package = PackageSpec::with_weight(dec!(2.345))
        .with_dimensions(dec!(33.3), dec!(21.7), dec!(18.1))
        .with_declared_value(dec!(149.99));

    let first = harness
        .engine
        .quote(Route::new(LIMA, AREQUIPA), &package, ServiceClass::Express, Modality::AddressToAddress)
        .await
        .unwrap();
    let second = harness
        .engine
        .quote(Route::new(LIMA, AREQUIPA), &package, ServiceClass::Express, Modality::AddressToAddress)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
    assert!(first.is_consistent());
}

#[tokio::test]
async fn test_same_origin_and_destination_is_a_validation_error() {
    let harness = Harness::new().await;
    let err = harness
        .engine
        .quote(
            Route::new(LIMA, LIMA),
            &PackageSpec::with_weight(dec!(1)),
            ServiceClass::Standard,
            Modality::BranchToBranch,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CourierError::Validation { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_non_positive_weight_is_rejected_before_lookup() {
    let harness = Harness::new().await;
    // Route has no tariff; the validation error must win
    let err = harness
        .engine
        .quote(
            Route::new(LIMA, KM21),
            &PackageSpec::with_weight(Decimal::ZERO),
            ServiceClass::Standard,
            Modality::BranchToBranch,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CourierError::Validation { ref field, .. } if field.contains("weight")));
}

#[tokio::test]
async fn test_partial_dimensions_are_rejected() {
    let harness = Harness::new().await;
    let mut package = PackageSpec::with_weight(dec!(2));
    package.length_cm = Some(dec!(30));
    let err = harness
        .engine
        .quote(Route::new(LIMA, AREQUIPA), &package, ServiceClass::Standard, Modality::BranchToBranch)
        .await
        .unwrap_err();
    assert!(matches!(err, CourierError::Validation { .. }));
}

#[tokio::test]
async fn test_missing_tariff_is_a_configuration_gap() {
    let harness = Harness::new().await;
    let err = harness
        .engine
        .quote(
            Route::new(LIMA, KM21),
            &PackageSpec::with_weight(dec!(1)),
            ServiceClass::Standard,
            Modality::BranchToBranch,
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, CourierError::NoTariffConfigured { origin, destination, .. } if origin == LIMA && destination == KM21)
    );
}

#[tokio::test]
async fn test_retired_tariff_is_not_used() {
    let harness = Harness::new().await;
    assert!(harness.store.deactivate_tariff(harness.tariff.tariff_id).await.unwrap());

    let err = harness
        .engine
        .quote(
            Route::new(LIMA, AREQUIPA),
            &PackageSpec::with_weight(dec!(1)),
            ServiceClass::Standard,
            Modality::BranchToBranch,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CourierError::NoTariffConfigured { .. }));
}

#[tokio::test]
async fn test_unknown_or_inactive_branches_are_rejected() {
    let harness = Harness::new().await;
    for route in [Route::new(LIMA, 999), Route::new(CLOSED, AREQUIPA)] {
        let err = harness
            .engine
            .quote(route, &PackageSpec::with_weight(dec!(1)), ServiceClass::Standard, Modality::BranchToBranch)
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::BranchNotFound(_)), "got {err:?}");
    }
}

#[tokio::test]
async fn test_oversized_parcels_are_rejected_instead_of_overflowing() {
    let harness = Harness::new().await;
    let cases = [
        (
            PackageSpec::with_weight(dec!(1)).with_dimensions(
                dec!(10000000000),
                dec!(10000000000),
                dec!(10000000000),
            ),
            "package.length_cm",
        ),
        (PackageSpec::with_weight(dec!(70000000000000000000000000000)), "package.weight_kg"),
        (
            PackageSpec::with_weight(dec!(1)).with_declared_value(dec!(1000000000000.01)),
            "package.declared_value",
        ),
    ];

    for (package, expected) in cases {
        let err = harness
            .engine
            .quote(Route::new(LIMA, AREQUIPA), &package, ServiceClass::Express, Modality::BranchToBranch)
            .await
            .unwrap_err();
        assert!(
            matches!(err, CourierError::Validation { ref field, .. } if field == expected),
            "got {err:?}"
        );

        let request = NewQuote::new(
            Route::new(LIMA, AREQUIPA),
            package,
            ServiceClass::Express,
            Modality::BranchToBranch,
        );
        let err = harness.quotes.create_quote(request).await.unwrap_err();
        assert!(matches!(err, CourierError::Validation { .. }), "got {err:?}");
    }
}

#[tokio::test]
async fn test_largest_accepted_parcel_is_priced() {
    let harness = Harness::new().await;
    let package = PackageSpec::with_weight(dec!(10000))
        .with_dimensions(dec!(10000), dec!(10000), dec!(10000))
        .with_declared_value(dec!(1000000000000));

    let breakdown = harness
        .engine
        .quote(Route::new(LIMA, AREQUIPA), &package, ServiceClass::Express, Modality::BranchToBranch)
        .await
        .unwrap();
    assert!(breakdown.is_consistent());
    assert!(breakdown.total > Decimal::ZERO);
}
