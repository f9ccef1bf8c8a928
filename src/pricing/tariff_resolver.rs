use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::database::TariffStore;
use crate::error::{CourierError, Result};
use crate::models::{Route, TariffEntry};

/// Read-only lookup of configured tariffs
///
/// Routes are directed: `A -> B` and `B -> A` resolve independently.
#[derive(Clone)]
pub struct TariffResolver {
    store: Arc<dyn TariffStore>,
}

impl std::fmt::Debug for TariffResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TariffResolver").finish_non_exhaustive()
    }
}

impl TariffResolver {
    pub fn new(store: Arc<dyn TariffStore>) -> Self {
        Self { store }
    }

    /// Active tariff for `origin -> destination`, `None` when nothing is
    /// configured. Identical endpoints are an input error, not a miss.
    pub async fn resolve(&self, origin_branch_id: i64, destination_branch_id: i64) -> Result<Option<TariffEntry>> {
        Route::new(origin_branch_id, destination_branch_id).validate()?;

        let tariff = self
            .store
            .find_active_tariff(origin_branch_id, destination_branch_id)
            .await?;
        debug!(
            origin = origin_branch_id,
            destination = destination_branch_id,
            found = tariff.is_some(),
            "tariff lookup"
        );
        Ok(tariff)
    }

    /// Like [`resolve`](Self::resolve) but a miss is `NoTariffConfigured`
    pub async fn require(&self, route: Route) -> Result<TariffEntry> {
        self.resolve(route.origin_branch_id, route.destination_branch_id)
            .await?
            .ok_or_else(|| CourierError::NoTariffConfigured {
                origin: route.origin_branch_id,
                destination: route.destination_branch_id,
                detail: "no active tariff for this route".to_string(),
            })
    }

    /// Whether a previously used tariff is still the one in force
    pub async fn is_active(&self, tariff_id: Uuid) -> Result<bool> {
        Ok(self
            .store
            .find_tariff(tariff_id)
            .await?
            .is_some_and(|tariff| tariff.active))
    }
}
