use chrono::{DateTime, Utc};
use tracing::debug;

use crate::constants::status_groups;
use crate::error::{CourierError, Result};
use crate::models::{Quote, Shipment};

/// Precondition checked before a state change is attempted
pub trait StateGuard<T> {
    /// Check if the change is allowed
    fn check(&self, entity: &T) -> Result<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;

    /// Check and log the guard that rejected the change
    fn enforce(&self, entity: &T) -> Result<()> {
        self.check(entity).inspect_err(|e| {
            debug!(guard = self.description(), error = %e, "guard rejected state change");
        })
    }
}

/// Handler assignment is only valid while the shipment is still at the branch
pub struct AssignmentGuard;

impl StateGuard<Shipment> for AssignmentGuard {
    fn check(&self, shipment: &Shipment) -> Result<()> {
        if status_groups::ASSIGNABLE.contains(&shipment.status) {
            Ok(())
        } else {
            Err(CourierError::InvalidStateForAssignment {
                shipment_id: shipment.shipment_id,
                current: shipment.status,
            })
        }
    }

    fn description(&self) -> &'static str {
        "Shipment must be registered or in warehouse to be assigned"
    }
}

/// Soft-deleted shipments accept no further events
pub struct NotDeletedGuard;

impl StateGuard<Shipment> for NotDeletedGuard {
    fn check(&self, shipment: &Shipment) -> Result<()> {
        match shipment.deleted_at {
            Some(deleted_at) => Err(CourierError::InvalidStateTransition {
                shipment_id: shipment.shipment_id,
                reason: format!("shipment was deleted at {deleted_at}"),
            }),
            None => Ok(()),
        }
    }

    fn description(&self) -> &'static str {
        "Shipment must not be deleted"
    }
}

/// A quote converts only while pending or approved and not past its expiry
pub struct QuoteConvertibleGuard {
    pub now: DateTime<Utc>,
}

impl StateGuard<Quote> for QuoteConvertibleGuard {
    fn check(&self, quote: &Quote) -> Result<()> {
        if !quote.status.is_convertible() {
            return Err(CourierError::InvalidQuoteState {
                quote_id: quote.quote_id,
                current: quote.status,
                expected: status_groups::CONVERTIBLE_QUOTES.to_vec(),
            });
        }
        if quote.is_expired_at(self.now) {
            return Err(CourierError::QuoteExpired {
                quote_id: quote.quote_id,
                expired_at: quote.expires_at,
            });
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Quote must be pending or approved and not expired"
    }
}

/// Operator review (approve/reject) is only valid on pending, unexpired quotes
pub struct QuoteReviewableGuard {
    pub now: DateTime<Utc>,
}

impl StateGuard<Quote> for QuoteReviewableGuard {
    fn check(&self, quote: &Quote) -> Result<()> {
        if !status_groups::REVIEWABLE_QUOTES.contains(&quote.status) {
            return Err(CourierError::InvalidQuoteState {
                quote_id: quote.quote_id,
                current: quote.status,
                expected: status_groups::REVIEWABLE_QUOTES.to_vec(),
            });
        }
        if quote.is_expired_at(self.now) {
            return Err(CourierError::QuoteExpired {
                quote_id: quote.quote_id,
                expired_at: quote.expires_at,
            });
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Quote must be pending and not expired to be reviewed"
    }
}
