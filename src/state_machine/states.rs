use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CourierError;

/// Shipment lifecycle states
///
/// The main path runs `Registered -> InWarehouse -> InTransit -> OutForDelivery
/// -> Delivered`; `Returned` and `Cancelled` are side exits reachable from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentState {
    /// Created from a quote or directly at a branch counter
    #[default]
    Registered,
    /// Received and held at the origin warehouse
    InWarehouse,
    /// Moving between branches
    InTransit,
    /// With a courier for last-mile delivery
    OutForDelivery,
    /// Handed over to the recipient
    Delivered,
    /// Sent back to the sender
    Returned,
    /// Cancelled before delivery
    Cancelled,
}

impl ShipmentState {
    pub const ALL: [ShipmentState; 7] = [
        Self::Registered,
        Self::InWarehouse,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Returned,
        Self::Cancelled,
    ];

    /// Progress shown to customers; a pure function of the state
    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::Registered => 10,
            Self::InWarehouse => 25,
            Self::InTransit => 60,
            Self::OutForDelivery => 90,
            Self::Delivered => 100,
            Self::Returned => 100,
            Self::Cancelled => 0,
        }
    }

    /// Position on the main delivery path, `None` for the side exits
    pub fn path_rank(&self) -> Option<u8> {
        match self {
            Self::Registered => Some(0),
            Self::InWarehouse => Some(1),
            Self::InTransit => Some(2),
            Self::OutForDelivery => Some(3),
            Self::Delivered => Some(4),
            Self::Returned | Self::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Returned | Self::Cancelled)
    }

    pub fn is_side_exit(&self) -> bool {
        matches!(self, Self::Returned | Self::Cancelled)
    }

    /// Event description used when the caller does not supply one
    pub fn canonical_description(&self) -> &'static str {
        match self {
            Self::Registered => "Shipment registered",
            Self::InWarehouse => "Shipment received at warehouse",
            Self::InTransit => "Shipment in transit to destination branch",
            Self::OutForDelivery => "Shipment out for delivery",
            Self::Delivered => "Shipment delivered",
            Self::Returned => "Shipment returned to sender",
            Self::Cancelled => "Shipment cancelled",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::InWarehouse => "IN_WAREHOUSE",
            Self::InTransit => "IN_TRANSIT",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Returned => "RETURNED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ShipmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShipmentState {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CourierError::validation("status", format!("unknown shipment state: {s}")))
    }
}

/// Quote states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteState {
    /// Priced and waiting for review or conversion
    #[default]
    Pending,
    /// Accepted by an operator
    Approved,
    /// Turned down by an operator
    Rejected,
    /// Turned into a shipment
    Converted,
    /// Passed its expiry time before conversion
    Expired,
}

impl QuoteState {
    pub const ALL: [QuoteState; 5] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Converted,
        Self::Expired,
    ];

    /// Allowed quote transitions
    pub fn can_transition_to(&self, target: QuoteState) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Pending, Self::Converted)
                | (Self::Pending, Self::Expired)
                | (Self::Approved, Self::Converted)
                | (Self::Approved, Self::Expired)
        )
    }

    pub fn is_convertible(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Converted | Self::Expired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Converted => "CONVERTED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for QuoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuoteState {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CourierError::validation("status", format!("unknown quote state: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_table() {
        let table: Vec<(ShipmentState, u8)> = ShipmentState::ALL
            .into_iter()
            .map(|s| (s, s.progress_percentage()))
            .collect();
        assert_eq!(
            table,
            vec![
                (ShipmentState::Registered, 10),
                (ShipmentState::InWarehouse, 25),
                (ShipmentState::InTransit, 60),
                (ShipmentState::OutForDelivery, 90),
                (ShipmentState::Delivered, 100),
                (ShipmentState::Returned, 100),
                (ShipmentState::Cancelled, 0),
            ]
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(ShipmentState::Delivered.is_terminal());
        assert!(ShipmentState::Returned.is_terminal());
        assert!(ShipmentState::Cancelled.is_terminal());
        assert!(!ShipmentState::OutForDelivery.is_terminal());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(ShipmentState::OutForDelivery.to_string(), "OUT_FOR_DELIVERY");
        assert_eq!(
            "in_transit".parse::<ShipmentState>().unwrap(),
            ShipmentState::InTransit
        );
        assert!("LOST".parse::<ShipmentState>().is_err());
        assert_eq!("approved".parse::<QuoteState>().unwrap(), QuoteState::Approved);
    }

    #[test]
    fn test_default_states() {
        assert_eq!(ShipmentState::default(), ShipmentState::Registered);
        assert_eq!(QuoteState::default(), QuoteState::Pending);
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&ShipmentState::InWarehouse).unwrap();
        assert_eq!(json, "\"IN_WAREHOUSE\"");
        let parsed: QuoteState = serde_json::from_str("\"CONVERTED\"").unwrap();
        assert_eq!(parsed, QuoteState::Converted);
    }

    #[test]
    fn test_quote_transition_table() {
        assert!(QuoteState::Pending.can_transition_to(QuoteState::Approved));
        assert!(QuoteState::Pending.can_transition_to(QuoteState::Rejected));
        assert!(QuoteState::Approved.can_transition_to(QuoteState::Converted));
        assert!(QuoteState::Approved.can_transition_to(QuoteState::Expired));
        assert!(!QuoteState::Approved.can_transition_to(QuoteState::Rejected));
        assert!(!QuoteState::Rejected.can_transition_to(QuoteState::Converted));
        assert!(!QuoteState::Converted.can_transition_to(QuoteState::Expired));
    }
}
