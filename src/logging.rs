//! # Structured Logging Module
//!
//! Environment-aware structured logging for the courier core. Console output
//! is human-readable by default and switches to JSON lines when
//! `COURIER_LOG_FORMAT=json`, which is what log shippers in production expect.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

use crate::config::ConfigManager;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = ConfigManager::detect_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(&environment)));
        let json = std::env::var("COURIER_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let console = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // Another global subscriber (test harness, embedding application) wins
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            json = json,
            "Structured logging initialized"
        );
    });
}

/// Log level used when `RUST_LOG` is not set
fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "warn",
        _ => "debug",
    }
}

/// Log structured data for shipment operations
pub fn log_shipment_operation(
    operation: &str,
    shipment_id: Option<Uuid>,
    tracking_code: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        shipment_id = shipment_id.map(|id| id.to_string()),
        tracking_code = tracking_code,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "SHIPMENT_OPERATION"
    );
}

/// Log structured data for quote operations
pub fn log_quote_operation(
    operation: &str,
    quote_id: Option<Uuid>,
    route: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        quote_id = quote_id.map(|id| id.to_string()),
        route = route,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "QUOTE_OPERATION"
    );
}
