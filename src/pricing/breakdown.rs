use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::MONEY_SCALE;

/// Full result of pricing a package on a route
///
/// Kept whole on quotes and shipments: conversion carries it over and
/// receipts print its components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Tariff base price before the service multiplier
    pub base_price: Decimal,
    pub service_multiplier: Decimal,
    pub volumetric_weight: Decimal,
    pub billable_weight: Decimal,
    /// Billable weight beyond the tariff's included weight
    pub extra_weight: Decimal,
    pub extra_cost: Decimal,
    /// Surcharge on declared value, part of the subtotal
    pub insurance: Decimal,
    /// Pre-tax amount, rounded to cents
    pub subtotal: Decimal,
    /// Rate in force when this breakdown was computed
    pub tax_rate: Decimal,
    pub tax_rate_version: String,
    pub tax: Decimal,
    /// `subtotal + tax`
    pub total: Decimal,
}

impl PriceBreakdown {
    /// `total == subtotal + tax` and the tax never makes the price smaller
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal + self.tax && self.total >= self.subtotal
    }
}

/// Round a money amount to cents, halves away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
