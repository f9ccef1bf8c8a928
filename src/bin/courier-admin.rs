//! # Courier Admin
//!
//! Operator tool for the courier core: check the effective configuration,
//! apply the database schema and price a route without storing a quote.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;

use courier_core::config::ConfigManager;
use courier_core::database::{DatabaseConnection, DatabaseMigrations, PgStore};
use courier_core::logging::init_structured_logging;
use courier_core::models::{Modality, PackageSpec, Route, ServiceClass};
use courier_core::pricing::QuotationEngine;

#[derive(Parser)]
#[command(name = "courier-admin")]
#[command(about = "Administer the courier quotation and shipment core")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to load (development, test, production, ...)
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load, validate and print the effective configuration
    ValidateConfig,

    /// Apply outstanding schema migrations
    Migrate {
        /// Directory holding the migration files
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },

    /// Price a package against the configured database
    Estimate {
        #[arg(long)]
        origin: i64,

        #[arg(long)]
        destination: i64,

        /// Actual weight in kg
        #[arg(long)]
        weight: Decimal,

        /// Dimensions in cm as LENGTHxWIDTHxHEIGHT
        #[arg(long)]
        dimensions: Option<String>,

        /// Value declared for insurance
        #[arg(long)]
        declared_value: Option<Decimal>,

        #[arg(long, default_value = "standard")]
        service: ServiceClass,

        #[arg(long, default_value = "branch_to_branch")]
        modality: Modality,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_structured_logging();

    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .context("failed to load configuration")?;

    match cli.command {
        Commands::ValidateConfig => {
            println!("Environment: {}", manager.environment());
            println!("Config directory: {}", manager.config_directory().display());
            println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
            println!("Configuration is valid");
        }
        Commands::Migrate { dir } => {
            let db = DatabaseConnection::new(&manager.config().database)
                .await
                .context("failed to connect to the database")?;
            let applied = DatabaseMigrations::run_from_directory(db.pool(), &dir)
                .await
                .context("migration failed")?;
            if applied.is_empty() {
                println!("Schema is up to date");
            }
            for migration in &applied {
                println!("Applied {} {}", migration.version, migration.name);
            }
            db.close().await;
        }
        Commands::Estimate {
            origin,
            destination,
            weight,
            dimensions,
            declared_value,
            service,
            modality,
        } => {
            let mut package = PackageSpec::with_weight(weight);
            if let Some(raw) = dimensions.as_deref() {
                let (length, width, height) = parse_dimensions(raw)?;
                package = package.with_dimensions(length, width, height);
            }
            if let Some(value) = declared_value {
                package = package.with_declared_value(value);
            }

            let db = DatabaseConnection::new(&manager.config().database)
                .await
                .context("failed to connect to the database")?;
            let store = Arc::new(PgStore::new(db.pool().clone()));
            let engine = QuotationEngine::new(store.clone(), store, manager.config().pricing.clone());
            let breakdown = engine
                .quote(Route::new(origin, destination), &package, service, modality)
                .await?;
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
            db.close().await;
        }
    }

    Ok(())
}

fn parse_dimensions(raw: &str) -> Result<(Decimal, Decimal, Decimal)> {
    let parts: Vec<&str> = raw.split(['x', 'X']).map(str::trim).collect();
    let [length, width, height] = parts.as_slice() else {
        bail!("dimensions must look like 30x20x10, got '{raw}'");
    };
    Ok((
        length.parse().context("invalid length")?,
        width.parse().context("invalid width")?,
        height.parse().context("invalid height")?,
    ))
}
