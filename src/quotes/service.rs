//! # Quote Service
//!
//! Prices and stores quotes, and moves them through operator review and the
//! time-triggered expiry. Conversion lives in [`super::converter`].

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::QuotesConfig;
use crate::constants::{events, status_groups};
use crate::database::{QuoteStore, StoreError};
use crate::error::{CourierError, Result};
use crate::events::EventPublisher;
use crate::logging::log_quote_operation;
use crate::models::{NewQuote, Quote};
use crate::pricing::QuotationEngine;
use crate::state_machine::{QuoteReviewableGuard, QuoteState, StateGuard};
use crate::validation::validate_contact;

pub struct QuoteService {
    quotes: Arc<dyn QuoteStore>,
    engine: Arc<QuotationEngine>,
    publisher: EventPublisher,
    validity: Duration,
}

impl std::fmt::Debug for QuoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteService")
            .field("engine", &self.engine)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl QuoteService {
    pub fn new(
        quotes: Arc<dyn QuoteStore>,
        engine: Arc<QuotationEngine>,
        config: &QuotesConfig,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            quotes,
            engine,
            publisher,
            validity: config.validity(),
        }
    }

    /// Price a request and store it as a pending quote
    #[instrument(skip(self, request), fields(route = %request.route))]
    pub async fn create_quote(&self, request: NewQuote) -> Result<Quote> {
        if let Some(contact) = &request.contact {
            validate_contact("contact", contact)?;
        }
        if let Some(recipient) = &request.recipient {
            validate_contact("recipient", recipient)?;
        }

        let priced = self
            .engine
            .price(request.route, &request.package, request.service_class, request.modality)
            .await?;
        let quote = request.into_quote(priced.tariff.tariff_id, priced.breakdown, Utc::now(), self.validity);
        let quote = self.quotes.insert_quote(quote).await?;

        log_quote_operation(
            "create",
            Some(quote.quote_id),
            Some(&quote.route.to_string()),
            quote.status.as_str(),
            None,
        );
        self.publisher.publish(
            events::QUOTE_CREATED,
            json!({
                "quote_id": quote.quote_id,
                "route": quote.route,
                "base_price": quote.base_price(),
                "final_price": quote.final_price(),
                "expires_at": quote.expires_at,
            }),
        );
        Ok(quote)
    }

    pub async fn approve(&self, quote_id: Uuid) -> Result<Quote> {
        self.review(quote_id, QuoteState::Approved, events::QUOTE_APPROVED).await
    }

    pub async fn reject(&self, quote_id: Uuid) -> Result<Quote> {
        self.review(quote_id, QuoteState::Rejected, events::QUOTE_REJECTED).await
    }

    #[instrument(skip(self))]
    async fn review(&self, quote_id: Uuid, to: QuoteState, event_name: &str) -> Result<Quote> {
        let now = Utc::now();
        let quote = self.find(quote_id).await?;
        QuoteReviewableGuard { now }.enforce(&quote)?;

        let quote = match self
            .quotes
            .update_quote_status(quote_id, status_groups::REVIEWABLE_QUOTES, to, now)
            .await
        {
            Ok(quote) => quote,
            // Raced with a conversion, expiry sweep or another review
            Err(StoreError::StateConflict { .. }) => {
                let latest = self.find(quote_id).await?;
                return Err(CourierError::InvalidQuoteState {
                    quote_id,
                    current: latest.status,
                    expected: status_groups::REVIEWABLE_QUOTES.to_vec(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        log_quote_operation("review", Some(quote_id), None, quote.status.as_str(), None);
        self.publisher
            .publish(event_name, json!({ "quote_id": quote_id, "status": quote.status }));
        Ok(quote)
    }

    /// Expire every open quote past its expiry, returning how many changed
    #[instrument(skip(self))]
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64> {
        let expired = self.quotes.expire_quotes(now).await?;
        if expired > 0 {
            info!(expired, "expired stale quotes");
            self.publisher
                .publish(events::QUOTE_EXPIRED, json!({ "count": expired, "as_of": now }));
        }
        Ok(expired)
    }

    pub async fn find(&self, quote_id: Uuid) -> Result<Quote> {
        self.quotes
            .find_quote(quote_id)
            .await?
            .ok_or(CourierError::QuoteNotFound(quote_id))
    }
}
