//! Classification of shipment state changes for the audit trail.
//!
//! Any enum-valid transition is accepted (operators correct mis-scans by
//! moving a shipment back), but every event records how the change relates to
//! the delivery path so corrections can be audited separately.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::states::ShipmentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// First event of a shipment
    Initial,
    /// Further along the delivery path
    Forward,
    /// Same state recorded again (new scan, new evidence)
    Repeat,
    /// Into `Returned` or `Cancelled` from a non-terminal state
    SideExit,
    /// Earlier on the delivery path than the current state
    Backward,
    /// Out of a terminal state
    Reopen,
}

impl TransitionKind {
    pub fn classify(from: Option<ShipmentState>, to: ShipmentState) -> Self {
        let Some(from) = from else {
            return Self::Initial;
        };

        if from == to {
            return Self::Repeat;
        }
        if from.is_terminal() {
            return Self::Reopen;
        }
        if to.is_side_exit() {
            return Self::SideExit;
        }

        match (from.path_rank(), to.path_rank()) {
            (Some(current), Some(next)) if next > current => Self::Forward,
            _ => Self::Backward,
        }
    }

    /// Non-forward changes that deserve an audit flag
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Backward | Self::Reopen)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Forward => "forward",
            Self::Repeat => "repeat",
            Self::SideExit => "side_exit",
            Self::Backward => "backward",
            Self::Reopen => "reopen",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransitionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(Self::Initial),
            "forward" => Ok(Self::Forward),
            "repeat" => Ok(Self::Repeat),
            "side_exit" => Ok(Self::SideExit),
            "backward" => Ok(Self::Backward),
            "reopen" => Ok(Self::Reopen),
            _ => Err(format!("Invalid transition kind: {s}")),
        }
    }
}
