use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CourierError, Result};

/// Directed origin/destination branch pair
///
/// Routes are not symmetric: `Lima -> Cusco` and `Cusco -> Lima` are priced by
/// independent tariff entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub origin_branch_id: i64,
    pub destination_branch_id: i64,
}

impl Route {
    pub fn new(origin_branch_id: i64, destination_branch_id: i64) -> Self {
        Self {
            origin_branch_id,
            destination_branch_id,
        }
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.destination_branch_id, self.origin_branch_id)
    }

    /// Endpoints must be distinct
    pub fn validate(&self) -> Result<()> {
        if self.origin_branch_id == self.destination_branch_id {
            return Err(CourierError::validation(
                "route",
                format!(
                    "origin and destination must differ (both are branch {})",
                    self.origin_branch_id
                ),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin_branch_id, self.destination_branch_id)
    }
}

/// Service class, each priced through the tariff's multiplier table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceClass {
    Economy,
    Standard,
    Express,
}

impl ServiceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Economy => "ECONOMY",
            Self::Standard => "STANDARD",
            Self::Express => "EXPRESS",
        }
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceClass {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ECONOMY" => Ok(Self::Economy),
            "STANDARD" => Ok(Self::Standard),
            "EXPRESS" => Ok(Self::Express),
            _ => Err(CourierError::validation(
                "service_class",
                format!("unknown service class: {s}"),
            )),
        }
    }
}

impl Default for ServiceClass {
    fn default() -> Self {
        Self::Standard
    }
}

/// Where the parcel is handed in and where it is handed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    BranchToBranch,
    BranchToAddress,
    AddressToBranch,
    AddressToAddress,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BranchToBranch => "BRANCH_TO_BRANCH",
            Self::BranchToAddress => "BRANCH_TO_ADDRESS",
            Self::AddressToBranch => "ADDRESS_TO_BRANCH",
            Self::AddressToAddress => "ADDRESS_TO_ADDRESS",
        }
    }

    /// Whether the courier collects the parcel at the sender's address
    pub fn picks_up_at_address(&self) -> bool {
        matches!(self, Self::AddressToBranch | Self::AddressToAddress)
    }

    /// Whether the courier delivers to the recipient's address
    pub fn delivers_to_address(&self) -> bool {
        matches!(self, Self::BranchToAddress | Self::AddressToAddress)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Modality {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BRANCH_TO_BRANCH" => Ok(Self::BranchToBranch),
            "BRANCH_TO_ADDRESS" => Ok(Self::BranchToAddress),
            "ADDRESS_TO_BRANCH" => Ok(Self::AddressToBranch),
            "ADDRESS_TO_ADDRESS" => Ok(Self::AddressToAddress),
            _ => Err(CourierError::validation(
                "modality",
                format!("unknown modality: {s}"),
            )),
        }
    }
}

impl Default for Modality {
    fn default() -> Self {
        Self::BranchToBranch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_rejects_same_endpoints() {
        assert!(Route::new(1, 2).validate().is_ok());
        let err = Route::new(3, 3).validate().unwrap_err();
        assert!(matches!(err, CourierError::Validation { ref field, .. } if field == "route"));
    }

    #[test]
    fn test_route_reversal_is_a_distinct_route() {
        let route = Route::new(1, 2);
        assert_eq!(route.reversed(), Route::new(2, 1));
        assert_ne!(route, route.reversed());
    }

    #[test]
    fn test_modality_address_legs() {
        assert!(Modality::AddressToAddress.picks_up_at_address());
        assert!(Modality::AddressToAddress.delivers_to_address());
        assert!(!Modality::BranchToBranch.picks_up_at_address());
        assert!(Modality::BranchToAddress.delivers_to_address());
        assert_eq!(
            "address_to_branch".parse::<Modality>().unwrap(),
            Modality::AddressToBranch
        );
    }
}
