//! Read-only aggregates for statistics views. Soft-deleted shipments are
//! excluded everywhere; cancelled shipments count per status but earn no
//! revenue.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::database::ShipmentStore;
use crate::error::Result;
use crate::state_machine::ShipmentState;

/// Shipment counts per status plus revenue over a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentSummary {
    pub counts: BTreeMap<ShipmentState, i64>,
    pub total: i64,
    pub revenue: Decimal,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub struct ShipmentReport {
    shipments: Arc<dyn ShipmentStore>,
}

impl ShipmentReport {
    pub fn new(shipments: Arc<dyn ShipmentStore>) -> Self {
        Self { shipments }
    }

    /// Count per status; every state is present, zero when unused
    pub async fn status_counts(&self) -> Result<BTreeMap<ShipmentState, i64>> {
        let mut counts: BTreeMap<ShipmentState, i64> =
            ShipmentState::ALL.into_iter().map(|state| (state, 0)).collect();
        counts.extend(self.shipments.status_counts().await?);
        Ok(counts)
    }

    /// Sum of shipment totals created in `[from, to)`
    pub async fn revenue(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<Decimal> {
        Ok(self.shipments.revenue(from, to).await?)
    }

    pub async fn summary(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<ShipmentSummary> {
        let counts = self.status_counts().await?;
        let revenue = self.revenue(from, to).await?;
        Ok(ShipmentSummary {
            total: counts.values().sum(),
            counts,
            revenue,
            from,
            to,
        })
    }
}
