//! TVM Gateway Binary
//!
//! HTTP server for device registration and token vending.

use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tvm_auth::{http, AnonymousTokenService, InMemoryDeviceRegistry, TvmConfig};

/// Anonymous-mode Token Vending Machine
#[derive(Debug, Parser)]
#[command(name = "tvm-gateway", version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "TVM_CONFIG")]
    config: Option<PathBuf>,
}

/// Main entry point
#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config =
        TvmConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    info!(
        freshness_window = %humantime_serde::re::humantime::format_duration(config.freshness_window),
        authority = ?config.authority.kind,
        "Configuration loaded"
    );

    let registry = Arc::new(InMemoryDeviceRegistry::new());
    let authority = config.build_authority()?;
    let service = AnonymousTokenService::new(registry, authority)
        .with_freshness(config.freshness_validator()?);

    let bind_addr = config.bind_addr();
    info!("Starting TVM Gateway on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .wrap(middleware::Logger::default())
            .configure(http::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
