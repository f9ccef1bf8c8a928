//! Lifecycle notifications for tracking integrations and webhooks.
//!
//! Services publish after their write has committed; a notification that
//! nobody receives is not an error and never fails the write.

pub mod publisher;

pub use publisher::{EventPublisher, PublishedEvent};
