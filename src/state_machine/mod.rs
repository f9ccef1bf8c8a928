// State machine module for the shipment and quote lifecycles
//
// States carry their fixed lookup tables (progress percentage, canonical event
// text), transitions classify how a change relates to the delivery path, and
// guards hold the preconditions checked before a change is persisted.

pub mod guards;
pub mod states;
pub mod transitions;

// Re-export main types for convenient access
pub use guards::{
    AssignmentGuard, NotDeletedGuard, QuoteConvertibleGuard, QuoteReviewableGuard, StateGuard,
};
pub use states::{QuoteState, ShipmentState};
pub use transitions::TransitionKind;
