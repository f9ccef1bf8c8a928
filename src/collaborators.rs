//! # External Collaborators
//!
//! Interfaces to the systems the courier core consumes but does not own: the
//! branch registry, the customer directory and the geography lookup. Both
//! store implementations in [`crate::database`] provide them so the core can
//! run standalone.

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::StoreResult;
use crate::models::{Branch, Customer, GeoStamp, NewCustomer};

#[async_trait]
pub trait BranchRegistry: Send + Sync {
    async fn get_branch(&self, branch_id: i64) -> StoreResult<Option<Branch>>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_by_document(&self, document_number: &str) -> StoreResult<Option<Customer>>;

    async fn find_customer(&self, customer_id: Uuid) -> StoreResult<Option<Customer>>;

    /// Create a customer; a document number already on file fails with
    /// `StoreError::UniqueViolation`
    async fn create_customer(&self, customer: NewCustomer) -> StoreResult<Customer>;
}

#[async_trait]
pub trait GeographyLookup: Send + Sync {
    /// District, province and department for a district code
    async fn lookup_district(&self, district_code: &str) -> StoreResult<Option<GeoStamp>>;
}
