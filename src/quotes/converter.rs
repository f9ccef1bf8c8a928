//! # Quote Converter
//!
//! Turns a stored quote into a shipment.
//!
//! ## Flow
//!
//! 1. The quote must be pending or approved and not past its expiry.
//! 2. The customer is the one the quote references, or is resolved from the
//!    caller's [`CustomerOverride`]: looked up by document number and created
//!    when absent. Without an override the result is
//!    [`ConversionOutcome::RequiresCustomerData`], which is not an error.
//! 3. The quote's stored breakdown is carried over. Only when its tariff has
//!    been retired since quoting is the price recomputed.
//! 4. The shipment, its first event and the quote's flip to `CONVERTED` are
//!    written in one atomic unit.
//!
//! ## Placeholder documents
//!
//! A missing or invalid document does not block conversion. The customer is
//! created under `TMP-<first 8 hex digits of the quote id>` with
//! `document_verified = false`. The placeholder depends only on the quote, so
//! a retried conversion finds the customer it created the first time.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::service::QuoteService;
use crate::collaborators::CustomerDirectory;
use crate::constants::{events, status_groups};
use crate::database::StoreError;
use crate::error::{CourierError, Result};
use crate::events::EventPublisher;
use crate::lifecycle::ShipmentLifecycle;
use crate::logging::log_quote_operation;
use crate::models::{BillingBlock, Customer, DocumentType, NewCustomer, Quote, Shipment, ShipmentDraft};
use crate::pricing::{PriceBreakdown, QuotationEngine};
use crate::state_machine::{QuoteConvertibleGuard, StateGuard};
use crate::validation::{validate_document, validate_email, validate_phone};

const PLACEHOLDER_PREFIX: &str = "TMP-";

/// Customer data collected from the caller when the quote references no
/// customer record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOverride {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub district_code: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
}

impl CustomerOverride {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            ..Default::default()
        }
    }

    pub fn with_document(mut self, document_type: DocumentType, number: impl Into<String>) -> Self {
        self.document_type = Some(document_type);
        self.document_number = Some(number.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>, district_code: Option<String>) -> Self {
        self.address = Some(address.into());
        self.district_code = district_code;
        self
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("customer.name");
        }
        if self.phone.trim().is_empty() {
            missing.push("customer.phone");
        }
        missing
    }
}

/// Result of a conversion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Converted(Shipment),
    /// Nothing was written; collect the listed fields and convert again
    RequiresCustomerData {
        quote_id: Uuid,
        missing_fields: Vec<&'static str>,
    },
}

impl ConversionOutcome {
    pub fn shipment(&self) -> Option<&Shipment> {
        match self {
            Self::Converted(shipment) => Some(shipment),
            Self::RequiresCustomerData { .. } => None,
        }
    }

    pub fn into_shipment(self) -> Option<Shipment> {
        match self {
            Self::Converted(shipment) => Some(shipment),
            Self::RequiresCustomerData { .. } => None,
        }
    }

    pub fn requires_customer_data(&self) -> bool {
        matches!(self, Self::RequiresCustomerData { .. })
    }
}

pub struct QuoteConverter {
    quotes: Arc<QuoteService>,
    customers: Arc<dyn CustomerDirectory>,
    engine: Arc<QuotationEngine>,
    lifecycle: Arc<ShipmentLifecycle>,
    publisher: EventPublisher,
}

impl std::fmt::Debug for QuoteConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteConverter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl QuoteConverter {
    pub fn new(
        quotes: Arc<QuoteService>,
        customers: Arc<dyn CustomerDirectory>,
        engine: Arc<QuotationEngine>,
        lifecycle: Arc<ShipmentLifecycle>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            quotes,
            customers,
            engine,
            lifecycle,
            publisher,
        }
    }

    /// Convert a quote into a shipment
    #[instrument(skip(self, customer_override))]
    pub async fn convert(
        &self,
        quote_id: Uuid,
        customer_override: Option<CustomerOverride>,
    ) -> Result<ConversionOutcome> {
        let quote = self.quotes.find(quote_id).await?;
        QuoteConvertibleGuard { now: Utc::now() }.enforce(&quote)?;

        let customer = match quote.customer_id {
            Some(customer_id) => self
                .customers
                .find_customer(customer_id)
                .await?
                .ok_or(CourierError::CustomerNotFound(customer_id))?,
            None => {
                let missing_fields = customer_override
                    .as_ref()
                    .map(CustomerOverride::missing_fields)
                    .unwrap_or_else(|| vec!["customer.name", "customer.phone"]);
                match customer_override {
                    Some(data) if missing_fields.is_empty() => self.resolve_customer(quote_id, data).await?,
                    _ => {
                        info!(%quote_id, ?missing_fields, "conversion needs customer data");
                        return Ok(ConversionOutcome::RequiresCustomerData {
                            quote_id,
                            missing_fields,
                        });
                    }
                }
            }
        };

        let price = self.settle_price(&quote).await?;
        let draft = Self::draft_for(&quote, &customer, price);

        let shipment = match self.lifecycle.create_from_quote(quote_id, draft).await {
            Ok(shipment) => shipment,
            Err(CourierError::Storage(StoreError::StateConflict { .. })) => {
                // Converted, expired or rejected by someone else since the guard ran
                let latest = self.quotes.find(quote_id).await?;
                return Err(CourierError::InvalidQuoteState {
                    quote_id,
                    current: latest.status,
                    expected: status_groups::CONVERTIBLE_QUOTES.to_vec(),
                });
            }
            Err(CourierError::Storage(StoreError::QuoteExpired { expired_at, .. })) => {
                return Err(CourierError::QuoteExpired { quote_id, expired_at });
            }
            Err(CourierError::Storage(StoreError::NotFound { .. })) => {
                return Err(CourierError::QuoteNotFound(quote_id));
            }
            Err(err) => return Err(err),
        };

        log_quote_operation(
            "convert",
            Some(quote_id),
            Some(&quote.route.to_string()),
            "CONVERTED",
            Some(&shipment.tracking_code),
        );
        self.publisher.publish(
            events::QUOTE_CONVERTED,
            json!({
                "quote_id": quote_id,
                "shipment_id": shipment.shipment_id,
                "tracking_code": shipment.tracking_code,
                "customer_id": customer.customer_id,
                "quoted_total": quote.final_price(),
                "total_price": shipment.total_price,
            }),
        );
        Ok(ConversionOutcome::Converted(shipment))
    }

    /// Find the customer by document number or create it
    async fn resolve_customer(&self, quote_id: Uuid, data: CustomerOverride) -> Result<Customer> {
        let phone = validate_phone("customer.phone", &data.phone)?;
        if let Some(email) = data.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email("customer.email", email)?;
        }

        let (document_type, document_number, document_verified) = Self::document_for(quote_id, &data);
        if let Some(existing) = self.customers.find_by_document(&document_number).await? {
            debug!(customer_id = %existing.customer_id, "reusing customer found by document");
            return Ok(existing);
        }

        let new_customer = NewCustomer {
            document_type,
            document_number: document_number.clone(),
            document_verified,
            name: data.name.trim().to_string(),
            phone: Some(phone),
            email: data.email.filter(|e| !e.trim().is_empty()),
            address: data.address,
        };
        match self.customers.create_customer(new_customer).await {
            Ok(customer) => {
                info!(
                    customer_id = %customer.customer_id,
                    document_verified,
                    "created customer during quote conversion"
                );
                Ok(customer)
            }
            // A concurrent conversion created it first
            Err(err) if err.is_unique_violation() => self
                .customers
                .find_by_document(&document_number)
                .await?
                .ok_or_else(|| CourierError::Storage(err)),
            Err(err) => Err(err.into()),
        }
    }

    /// Validated document from the override, or the quote's placeholder
    fn document_for(quote_id: Uuid, data: &CustomerOverride) -> (DocumentType, String, bool) {
        if let (Some(document_type), Some(number)) = (data.document_type, data.document_number.as_deref()) {
            let number = number.trim();
            match validate_document(document_type, number) {
                Ok(()) if document_type != DocumentType::Placeholder => {
                    return (document_type, number.to_string(), true);
                }
                Ok(()) => {}
                Err(err) => warn!(%quote_id, error = %err, "document rejected, using placeholder"),
            }
        }
        (DocumentType::Placeholder, placeholder_document(quote_id), false)
    }

    /// Stored breakdown, or a fresh one when the quote's tariff was retired
    async fn settle_price(&self, quote: &Quote) -> Result<PriceBreakdown> {
        if self.engine.resolver().is_active(quote.tariff_id).await? {
            return Ok(quote.breakdown.clone());
        }

        let repriced = self
            .engine
            .price(quote.route, &quote.package, quote.service_class, quote.modality)
            .await?;
        warn!(
            quote_id = %quote.quote_id,
            retired_tariff_id = %quote.tariff_id,
            tariff_id = %repriced.tariff.tariff_id,
            quoted_total = %quote.final_price(),
            total = %repriced.breakdown.total,
            "quote tariff retired, price recomputed"
        );
        Ok(repriced.breakdown)
    }

    fn draft_for(quote: &Quote, customer: &Customer, price: PriceBreakdown) -> ShipmentDraft {
        let mut sender = customer.contact_block();
        if let Some(contact) = &quote.contact {
            sender.district_code = contact.district_code.clone();
            if sender.address.is_none() {
                sender.address = contact.address.clone();
            }
        }
        let billing = customer.document_verified.then(|| BillingBlock {
            document_type: customer.document_type,
            document_number: customer.document_number.clone(),
            legal_name: customer.name.clone(),
            address: customer.address.clone(),
        });

        ShipmentDraft {
            customer_id: customer.customer_id,
            quote_id: Some(quote.quote_id),
            route: quote.route,
            package: quote.package.clone(),
            service_class: quote.service_class,
            modality: quote.modality,
            price,
            sender,
            recipient: quote.recipient.clone().unwrap_or_default(),
            pickup: None,
            billing,
        }
    }
}

/// Placeholder document number for a quote's customer
pub fn placeholder_document(quote_id: Uuid) -> String {
    let simple = quote_id.simple().to_string().to_ascii_uppercase();
    format!("{PLACEHOLDER_PREFIX}{}", &simple[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_stable_per_quote() {
        let quote_id = Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
        assert_eq!(placeholder_document(quote_id), "TMP-1B4E28BA");
        assert_eq!(placeholder_document(quote_id), placeholder_document(quote_id));
        assert!(validate_document(DocumentType::Placeholder, &placeholder_document(quote_id)).is_ok());
    }

    #[test]
    fn test_missing_override_fields() {
        assert!(CustomerOverride::new("Ana Quispe", "987654321").missing_fields().is_empty());
        assert_eq!(
            CustomerOverride::new(" ", "").missing_fields(),
            vec!["customer.name", "customer.phone"]
        );
    }

    #[test]
    fn test_invalid_document_falls_back_to_placeholder() {
        let quote_id = Uuid::new_v4();
        let data = CustomerOverride::new("Ana", "987654321").with_document(DocumentType::Dni, "123");
        let (document_type, number, verified) = QuoteConverter::document_for(quote_id, &data);
        assert_eq!(document_type, DocumentType::Placeholder);
        assert_eq!(number, placeholder_document(quote_id));
        assert!(!verified);

        let data = CustomerOverride::new("Ana", "987654321").with_document(DocumentType::Dni, "45678912");
        let (document_type, number, verified) = QuoteConverter::document_for(quote_id, &data);
        assert_eq!(document_type, DocumentType::Dni);
        assert_eq!(number, "45678912");
        assert!(verified);
    }
}
