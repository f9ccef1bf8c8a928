//! # Quotation Engine
//!
//! Turns a route, a package and a service class into a [`PriceBreakdown`].
//!
//! ## Arithmetic
//!
//! ```text
//! billable  = max(weight, volume / divisor, minimum)
//! extra     = max(0, billable - tariff.included_weight)
//! subtotal  = round2(base * multiplier + extra * per_kg + declared * insurance_rate)
//! tax       = round2(subtotal * tax_rate)
//! total     = subtotal + tax
//! ```
//!
//! Rounding is half-up to cents. The tax policy is fixed when the engine is
//! built and recorded on every breakdown, so no result depends on call time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::breakdown::{round_money, PriceBreakdown};
use super::tariff_resolver::TariffResolver;
use crate::collaborators::BranchRegistry;
use crate::config::PricingConfig;
use crate::database::TariffStore;
use crate::error::{CourierError, Result};
use crate::models::{Modality, PackageSpec, Route, ServiceClass, TariffEntry};

/// Tax rate together with the label it is published under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxPolicy {
    pub rate: Decimal,
    pub version: String,
}

impl TaxPolicy {
    pub fn new(rate: Decimal, version: impl Into<String>) -> Self {
        Self {
            rate,
            version: version.into(),
        }
    }
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self::new(crate::constants::IGV_RATE, crate::constants::IGV_RATE_VERSION)
    }
}

impl From<&PricingConfig> for TaxPolicy {
    fn from(config: &PricingConfig) -> Self {
        Self::new(config.tax_rate, config.tax_rate_version.clone())
    }
}

/// A breakdown and the tariff it was computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedQuote {
    pub tariff: TariffEntry,
    pub breakdown: PriceBreakdown,
}

pub struct QuotationEngine {
    resolver: TariffResolver,
    branches: Arc<dyn BranchRegistry>,
    pricing: PricingConfig,
    tax: TaxPolicy,
}

impl std::fmt::Debug for QuotationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotationEngine")
            .field("pricing", &self.pricing)
            .field("tax", &self.tax)
            .finish_non_exhaustive()
    }
}

impl QuotationEngine {
    pub fn new(tariffs: Arc<dyn TariffStore>, branches: Arc<dyn BranchRegistry>, pricing: PricingConfig) -> Self {
        let tax = TaxPolicy::from(&pricing);
        Self {
            resolver: TariffResolver::new(tariffs),
            branches,
            pricing,
            tax,
        }
    }

    pub fn resolver(&self) -> &TariffResolver {
        &self.resolver
    }

    pub fn tax_policy(&self) -> &TaxPolicy {
        &self.tax
    }

    /// Price a package without storing anything
    pub async fn quote(
        &self,
        route: Route,
        package: &PackageSpec,
        service_class: ServiceClass,
        modality: Modality,
    ) -> Result<PriceBreakdown> {
        Ok(self.price(route, package, service_class, modality).await?.breakdown)
    }

    /// Price a package and return the tariff used
    #[instrument(skip(self, package))]
    pub async fn price(
        &self,
        route: Route,
        package: &PackageSpec,
        service_class: ServiceClass,
        modality: Modality,
    ) -> Result<PricedQuote> {
        package.validate()?;
        route.validate()?;
        for branch_id in [route.origin_branch_id, route.destination_branch_id] {
            match self.branches.get_branch(branch_id).await? {
                Some(branch) if branch.active => {}
                _ => return Err(CourierError::BranchNotFound(branch_id)),
            }
        }

        let tariff = self.resolver.require(route).await?;
        let breakdown = self.compute(&tariff, package, service_class)?;
        debug!(
            tariff_id = %tariff.tariff_id,
            modality = %modality,
            billable_weight = %breakdown.billable_weight,
            total = %breakdown.total,
            "priced package"
        );
        Ok(PricedQuote { tariff, breakdown })
    }

    /// The pricing arithmetic against a known tariff
    pub fn compute(
        &self,
        tariff: &TariffEntry,
        package: &PackageSpec,
        service_class: ServiceClass,
    ) -> Result<PriceBreakdown> {
        let multiplier = tariff
            .multiplier_for(service_class)
            .ok_or_else(|| CourierError::NoTariffConfigured {
                origin: tariff.origin_branch_id,
                destination: tariff.destination_branch_id,
                detail: format!("no multiplier configured for {service_class} service"),
            })?;

        package.validate()?;

        let divisor = self.pricing.volumetric_divisor;
        let volumetric_weight = package.volumetric_weight(divisor);
        let billable_weight = package.billable_weight(divisor, self.pricing.minimum_billable_weight_kg);
        let extra_weight = (billable_weight - tariff.included_weight_kg).max(Decimal::ZERO);
        let extra_cost = round_money(in_range(
            extra_weight.checked_mul(tariff.price_per_extra_kg),
            "price.extra_cost",
        )?);
        let insurance = match package.declared_value {
            Some(declared) => round_money(in_range(
                declared.checked_mul(self.pricing.insurance_rate),
                "price.insurance",
            )?),
            None => Decimal::ZERO,
        };

        let service_price = in_range(tariff.base_price.checked_mul(multiplier), "price.base")?;
        let subtotal = round_money(in_range(
            service_price
                .checked_add(extra_cost)
                .and_then(|sum| sum.checked_add(insurance)),
            "price.subtotal",
        )?);
        let tax = round_money(in_range(subtotal.checked_mul(self.tax.rate), "price.tax")?);
        let total = in_range(subtotal.checked_add(tax), "price.total")?;

        Ok(PriceBreakdown {
            base_price: tariff.base_price,
            service_multiplier: multiplier,
            volumetric_weight,
            billable_weight,
            extra_weight,
            extra_cost,
            insurance,
            subtotal,
            tax_rate: self.tax.rate,
            tax_rate_version: self.tax.version.clone(),
            tax,
            total,
        })
    }
}

/// Map an overflowed amount to a validation error on `field`
fn in_range(amount: Option<Decimal>, field: &str) -> Result<Decimal> {
    amount.ok_or_else(|| CourierError::validation(field, "amount exceeds the supported range"))
}
