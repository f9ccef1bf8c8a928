//! # Shipment Lifecycle
//!
//! Owner of every shipment after creation. Creation allocates a tracking code
//! and writes the shipment with its `REGISTERED` event in one atomic unit;
//! each later change writes the new status, the matching progress percentage,
//! the delivery time and one appended event together.
//!
//! ## Transitions
//!
//! Any state of the fixed enum may follow any other: operators correct
//! mis-scans by moving shipments back. Every event records its
//! [`TransitionKind`](crate::state_machine::TransitionKind) and backward or
//! reopening changes are logged at `warn` so they can be audited.
//!
//! Soft-deleted shipments accept no further changes.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::collaborators::{BranchRegistry, GeographyLookup};
use crate::config::TrackingConfig;
use crate::constants::{events, status_groups};
use crate::database::{with_unique_retry, ShipmentStore, StatusChange, StoreError};
use crate::error::{CourierError, Result};
use crate::events::EventPublisher;
use crate::logging::log_shipment_operation;
use crate::models::{ContactBlock, NewShipmentEvent, Shipment, ShipmentDraft, ShipmentEvent};
use crate::state_machine::{AssignmentGuard, NotDeletedGuard, ShipmentState, StateGuard};
use crate::tracking::TrackingCodeGenerator;
use crate::validation::{validate_evidence_url, validate_shipment_draft};

/// A requested status change; unset fields get per-state defaults
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionRequest {
    pub status: ShipmentState,
    pub description: Option<String>,
    pub location: Option<String>,
    pub photo_url: Option<String>,
    pub signature_url: Option<String>,
}

impl TransitionRequest {
    pub fn to(status: ShipmentState) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_photo(mut self, photo_url: impl Into<String>) -> Self {
        self.photo_url = Some(photo_url.into());
        self
    }

    pub fn with_signature(mut self, signature_url: impl Into<String>) -> Self {
        self.signature_url = Some(signature_url.into());
        self
    }
}

pub struct ShipmentLifecycle {
    shipments: Arc<dyn ShipmentStore>,
    branches: Arc<dyn BranchRegistry>,
    geography: Arc<dyn GeographyLookup>,
    codes: TrackingCodeGenerator,
    publisher: EventPublisher,
    max_attempts: u32,
}

impl std::fmt::Debug for ShipmentLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipmentLifecycle")
            .field("codes", &self.codes)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl ShipmentLifecycle {
    pub fn new(
        shipments: Arc<dyn ShipmentStore>,
        branches: Arc<dyn BranchRegistry>,
        geography: Arc<dyn GeographyLookup>,
        tracking: &TrackingConfig,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            codes: TrackingCodeGenerator::new(branches.clone(), tracking),
            shipments,
            branches,
            geography,
            publisher,
            max_attempts: tracking.max_attempts,
        }
    }

    /// Register a shipment and its first event
    #[instrument(skip(self, draft), fields(route = %draft.route))]
    pub async fn create(&self, draft: ShipmentDraft) -> Result<Shipment> {
        if draft.quote_id.is_some() {
            return Err(CourierError::validation(
                "quote_id",
                "shipments for a quote are created by converting the quote",
            ));
        }
        self.register(draft, None).await
    }

    /// Register the shipment for a quote and mark the quote converted in the
    /// same atomic unit. The quote must still be pending or approved.
    pub(crate) async fn create_from_quote(&self, quote_id: Uuid, mut draft: ShipmentDraft) -> Result<Shipment> {
        draft.quote_id = Some(quote_id);
        self.register(draft, Some(quote_id)).await
    }

    async fn register(&self, mut draft: ShipmentDraft, quote_id: Option<Uuid>) -> Result<Shipment> {
        validate_shipment_draft(&draft)?;

        self.stamp_geography(&mut draft.sender).await?;
        self.stamp_geography(&mut draft.recipient).await?;
        if let Some(pickup) = draft.pickup.as_mut() {
            self.stamp_geography(pickup).await?;
        }

        let origin = draft.route.origin_branch_id;
        let prefix = self.codes.prefix_for(origin).await?;
        let location = self.branch_label(origin).await?;
        let now = Utc::now();
        let today = now.date_naive();
        let first_event = NewShipmentEvent::new(
            ShipmentState::Registered,
            ShipmentState::Registered.canonical_description(),
            location,
            now,
        );

        let (shipment, _) = with_unique_retry(
            self.max_attempts,
            || self.codes.code_with_prefix(&prefix, today),
            |tracking_code| {
                let shipment = draft.clone().into_shipment(Uuid::new_v4(), tracking_code, now);
                let event = first_event.clone();
                let store = Arc::clone(&self.shipments);
                async move {
                    match quote_id {
                        Some(quote_id) => store.commit_conversion(quote_id, shipment, event).await,
                        None => store.insert_shipment_with_event(shipment, event).await,
                    }
                }
            },
        )
        .await?;

        log_shipment_operation(
            "register",
            Some(shipment.shipment_id),
            Some(&shipment.tracking_code),
            shipment.status.as_str(),
            quote_id.map(|_| "converted from quote"),
        );
        self.publisher.publish(
            events::SHIPMENT_REGISTERED,
            json!({
                "shipment_id": shipment.shipment_id,
                "tracking_code": shipment.tracking_code,
                "quote_id": shipment.quote_id,
                "status": shipment.status,
                "progress_percentage": shipment.progress_percentage,
                "total_price": shipment.total_price,
            }),
        );
        Ok(shipment)
    }

    /// Move a shipment to any state, appending one event
    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn transition(&self, shipment_id: Uuid, request: TransitionRequest) -> Result<Shipment> {
        if let Some(url) = &request.photo_url {
            validate_evidence_url("photo_url", url)?;
        }
        if let Some(url) = &request.signature_url {
            validate_evidence_url("signature_url", url)?;
        }

        let current = self.find(shipment_id).await?;
        NotDeletedGuard.enforce(&current)?;

        let status = request.status;
        let location = match request.location.filter(|l| !l.trim().is_empty()) {
            Some(location) => location,
            None => self.default_location(&current, status).await?,
        };
        let description = request
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| status.canonical_description().to_string());
        let event = NewShipmentEvent::new(status, description, location, Utc::now())
            .with_evidence(request.photo_url, request.signature_url);

        let (shipment, event) = self
            .shipments
            .apply_status_change(
                shipment_id,
                StatusChange {
                    status,
                    handler_id: None,
                    allowed_from: None,
                    event,
                },
            )
            .await
            .map_err(|err| Self::transition_conflict(shipment_id, err))?;

        self.after_status_change(&shipment, &event, events::SHIPMENT_STATUS_CHANGED);
        Ok(shipment)
    }

    /// Hand a shipment to a handler and move it to `IN_WAREHOUSE`.
    /// Only valid while the shipment is `REGISTERED` or `IN_WAREHOUSE`.
    #[instrument(skip(self))]
    pub async fn assign(&self, shipment_id: Uuid, handler_id: i64) -> Result<Shipment> {
        let current = self.find(shipment_id).await?;
        NotDeletedGuard.enforce(&current)?;
        AssignmentGuard.enforce(&current)?;

        let status = ShipmentState::InWarehouse;
        let location = self.branch_label(current.route.origin_branch_id).await?;
        let event = NewShipmentEvent::new(
            status,
            format!("Assigned to handler #{handler_id}"),
            location,
            Utc::now(),
        )
        .with_handler(handler_id);

        let result = self
            .shipments
            .apply_status_change(
                shipment_id,
                StatusChange {
                    status,
                    handler_id: Some(handler_id),
                    allowed_from: Some(status_groups::ASSIGNABLE.to_vec()),
                    event,
                },
            )
            .await;

        let (shipment, event) = match result {
            Ok(applied) => applied,
            // Lost a race with another change; report against the fresh state
            Err(StoreError::StateConflict { .. }) => {
                let latest = self.find(shipment_id).await?;
                NotDeletedGuard.enforce(&latest)?;
                return Err(CourierError::InvalidStateForAssignment {
                    shipment_id,
                    current: latest.status,
                });
            }
            Err(err) => return Err(err.into()),
        };

        self.after_status_change(&shipment, &event, events::SHIPMENT_ASSIGNED);
        Ok(shipment)
    }

    /// Mark a shipment deleted; it keeps its events and leaves reporting
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, shipment_id: Uuid) -> Result<Shipment> {
        let shipment = self
            .shipments
            .soft_delete_shipment(shipment_id, Utc::now())
            .await
            .map_err(|err| match err {
                StoreError::NotFound { .. } => CourierError::ShipmentNotFound(shipment_id),
                other => other.into(),
            })?;

        log_shipment_operation(
            "soft_delete",
            Some(shipment.shipment_id),
            Some(&shipment.tracking_code),
            shipment.status.as_str(),
            None,
        );
        self.publisher.publish(
            events::SHIPMENT_DELETED,
            json!({
                "shipment_id": shipment.shipment_id,
                "tracking_code": shipment.tracking_code,
            }),
        );
        Ok(shipment)
    }

    /// Ordered event log of a shipment
    pub async fn history(&self, shipment_id: Uuid) -> Result<Vec<ShipmentEvent>> {
        self.find(shipment_id).await?;
        Ok(self.shipments.list_events(shipment_id).await?)
    }

    pub async fn find(&self, shipment_id: Uuid) -> Result<Shipment> {
        self.shipments
            .find_shipment(shipment_id)
            .await?
            .ok_or(CourierError::ShipmentNotFound(shipment_id))
    }

    /// Public tracking lookup; deleted shipments are not found
    pub async fn find_by_tracking_code(&self, tracking_code: &str) -> Result<Option<Shipment>> {
        let code = tracking_code.trim().to_ascii_uppercase();
        Ok(self
            .shipments
            .find_by_tracking_code(&code)
            .await?
            .filter(|shipment| !shipment.is_deleted()))
    }

    fn after_status_change(&self, shipment: &Shipment, event: &ShipmentEvent, event_name: &str) {
        if event.transition_kind.is_flagged() {
            warn!(
                shipment_id = %shipment.shipment_id,
                tracking_code = %shipment.tracking_code,
                from = ?event.from_status,
                to = %event.status,
                transition_kind = %event.transition_kind,
                "non-forward shipment transition"
            );
        }
        log_shipment_operation(
            "transition",
            Some(shipment.shipment_id),
            Some(&shipment.tracking_code),
            shipment.status.as_str(),
            Some(event.transition_kind.as_str()),
        );
        self.publisher.publish(
            event_name,
            json!({
                "shipment_id": shipment.shipment_id,
                "tracking_code": shipment.tracking_code,
                "from_status": event.from_status,
                "status": shipment.status,
                "progress_percentage": shipment.progress_percentage,
                "transition_kind": event.transition_kind,
                "handler_id": shipment.handler_id,
                "occurred_at": event.occurred_at,
            }),
        );
    }

    fn transition_conflict(shipment_id: Uuid, err: StoreError) -> CourierError {
        match err {
            StoreError::NotFound { .. } => CourierError::ShipmentNotFound(shipment_id),
            StoreError::StateConflict { current, .. } => CourierError::InvalidStateTransition {
                shipment_id,
                reason: format!("shipment is {current}"),
            },
            other => other.into(),
        }
    }

    /// Destination branch once delivered, origin branch otherwise
    async fn default_location(&self, shipment: &Shipment, status: ShipmentState) -> Result<String> {
        let branch_id = if status == ShipmentState::Delivered {
            shipment.route.destination_branch_id
        } else {
            shipment.route.origin_branch_id
        };
        self.branch_label(branch_id).await
    }

    async fn branch_label(&self, branch_id: i64) -> Result<String> {
        match self.branches.get_branch(branch_id).await? {
            Some(branch) => Ok(branch.label()),
            None => {
                warn!(branch_id, "branch missing from registry, using generic location label");
                Ok(format!("Branch #{branch_id}"))
            }
        }
    }

    async fn stamp_geography(&self, contact: &mut ContactBlock) -> Result<()> {
        if !contact.needs_geo_stamp() {
            return Ok(());
        }
        let Some(code) = contact.district_code.clone() else {
            return Ok(());
        };
        match self.geography.lookup_district(&code).await? {
            Some(geo) => {
                debug!(district_code = %code, district = %geo.district, "stamped contact geography");
                contact.geo = Some(geo);
            }
            None => info!(district_code = %code, "unknown district code, contact left unstamped"),
        }
        Ok(())
    }
}
