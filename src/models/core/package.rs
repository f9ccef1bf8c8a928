//! # Package
//!
//! Physical attributes of a parcel, the single typed shape used by quotes and
//! shipments alike.
//!
//! Volumetric weight follows the courier-industry convention of
//! `length × width × height / 6000` (cm³ per kg); billable weight is the
//! largest of actual weight, volumetric weight and the minimum billable
//! weight.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_DECLARED_VALUE, MAX_PACKAGE_SIDE_CM, MAX_PACKAGE_WEIGHT_KG};
use crate::error::{CourierError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Actual weight in kilograms, must be positive
    pub weight_kg: Decimal,
    pub length_cm: Option<Decimal>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    /// Value declared for insurance, never negative
    pub declared_value: Option<Decimal>,
    pub description: Option<String>,
}

impl PackageSpec {
    /// Package with only a weight
    pub fn with_weight(weight_kg: Decimal) -> Self {
        Self {
            weight_kg,
            length_cm: None,
            width_cm: None,
            height_cm: None,
            declared_value: None,
            description: None,
        }
    }

    pub fn with_dimensions(mut self, length_cm: Decimal, width_cm: Decimal, height_cm: Decimal) -> Self {
        self.length_cm = Some(length_cm);
        self.width_cm = Some(width_cm);
        self.height_cm = Some(height_cm);
        self
    }

    pub fn with_declared_value(mut self, declared_value: Decimal) -> Self {
        self.declared_value = Some(declared_value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Volume in cm³ when all three dimensions are present and the product
    /// fits a `Decimal`
    pub fn volume_cm3(&self) -> Option<Decimal> {
        match (self.length_cm, self.width_cm, self.height_cm) {
            (Some(l), Some(w), Some(h)) => l.checked_mul(w)?.checked_mul(h),
            _ => None,
        }
    }

    /// Volumetric weight in kg, zero when dimensions are absent
    pub fn volumetric_weight(&self, divisor: Decimal) -> Decimal {
        self.volume_cm3()
            .map(|volume| volume / divisor)
            .unwrap_or(Decimal::ZERO)
    }

    /// `max(actual, volumetric, minimum)`
    pub fn billable_weight(&self, divisor: Decimal, minimum: Decimal) -> Decimal {
        self.weight_kg
            .max(self.volumetric_weight(divisor))
            .max(minimum)
    }

    pub fn validate(&self) -> Result<()> {
        if self.weight_kg <= Decimal::ZERO {
            return Err(CourierError::validation(
                "package.weight_kg",
                format!("must be greater than zero, got {}", self.weight_kg),
            ));
        }
        if self.weight_kg > MAX_PACKAGE_WEIGHT_KG {
            return Err(CourierError::validation(
                "package.weight_kg",
                format!("must not exceed {MAX_PACKAGE_WEIGHT_KG} kg, got {}", self.weight_kg),
            ));
        }

        let dimensions = [
            ("package.length_cm", self.length_cm),
            ("package.width_cm", self.width_cm),
            ("package.height_cm", self.height_cm),
        ];
        let present = dimensions.iter().filter(|(_, v)| v.is_some()).count();
        if present != 0 && present != dimensions.len() {
            return Err(CourierError::validation(
                "package.dimensions",
                "length, width and height must be given together",
            ));
        }
        for (field, value) in dimensions {
            if let Some(value) = value {
                if value <= Decimal::ZERO {
                    return Err(CourierError::validation(
                        field,
                        format!("must be greater than zero, got {value}"),
                    ));
                }
                if value > MAX_PACKAGE_SIDE_CM {
                    return Err(CourierError::validation(
                        field,
                        format!("must not exceed {MAX_PACKAGE_SIDE_CM} cm, got {value}"),
                    ));
                }
            }
        }

        if let Some(declared) = self.declared_value {
            if declared < Decimal::ZERO {
                return Err(CourierError::validation(
                    "package.declared_value",
                    format!("must not be negative, got {declared}"),
                ));
            }
            if declared > MAX_DECLARED_VALUE {
                return Err(CourierError::validation(
                    "package.declared_value",
                    format!("must not exceed {MAX_DECLARED_VALUE}, got {declared}"),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MINIMUM_BILLABLE_WEIGHT_KG, VOLUMETRIC_DIVISOR};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_light_package_bills_minimum_weight() {
        let package = PackageSpec::with_weight(d("0.5"));
        assert_eq!(package.volumetric_weight(VOLUMETRIC_DIVISOR), Decimal::ZERO);
        assert_eq!(
            package.billable_weight(VOLUMETRIC_DIVISOR, MINIMUM_BILLABLE_WEIGHT_KG),
            Decimal::ONE
        );
    }

    #[test]
    fn test_bulky_package_bills_volumetric_weight() {
        let package = PackageSpec::with_weight(d("2")).with_dimensions(d("60"), d("50"), d("40"));
        // 120000 cm³ / 6000 = 20 kg
        assert_eq!(
            package.billable_weight(VOLUMETRIC_DIVISOR, MINIMUM_BILLABLE_WEIGHT_KG),
            d("20")
        );
    }

    #[test]
    fn test_validation_rejects_bad_shapes() {
        assert!(PackageSpec::with_weight(Decimal::ZERO).validate().is_err());
        assert!(PackageSpec::with_weight(d("-1")).validate().is_err());

        let mut partial = PackageSpec::with_weight(d("1"));
        partial.length_cm = Some(d("10"));
        assert!(partial.validate().is_err());

        let negative_value = PackageSpec::with_weight(d("1")).with_declared_value(d("-5"));
        assert!(negative_value.validate().is_err());

        let zero_side = PackageSpec::with_weight(d("1")).with_dimensions(d("10"), d("0"), d("10"));
        assert!(zero_side.validate().is_err());

        let too_heavy = PackageSpec::with_weight(d("10000.01"));
        assert!(too_heavy.validate().is_err());

        let too_long = PackageSpec::with_weight(d("1")).with_dimensions(d("10"), d("10001"), d("10"));
        assert!(matches!(
            too_long.validate(),
            Err(CourierError::Validation { ref field, .. }) if field == "package.width_cm"
        ));

        let fine = PackageSpec::with_weight(d("1"))
            .with_dimensions(d("10"), d("10"), d("10"))
            .with_declared_value(Decimal::ZERO);
        assert!(fine.validate().is_ok());
    }
}
