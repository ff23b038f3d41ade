//! Orderwire server entry point.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use orderwire::adapters::http::{app_router, AppSettings, AppState};
use orderwire::adapters::notifications::TracingNotifier;
use orderwire::adapters::postgres::{
    PostgresCustomerRepository, PostgresEventLog, PostgresMerchantDirectory,
    PostgresOrderRepository, PostgresPaymentRepository, PostgresSubscriptionRepository,
};
use orderwire::adapters::pricing::CatalogPriceResolver;
use orderwire::config::{AppConfig, LogFormat, ServerConfig};

fn init_tracing(server: &ServerConfig) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| server.log_level.clone());

    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(filter));
    let _ = match server.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    info!(
        environment = ?config.server.environment,
        provider = %config.payment.provider,
        "starting orderwire"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            error!(error = %e, "failed running migrations");
            e
        })?;
    }

    let state = AppState {
        event_log: Arc::new(PostgresEventLog::new(pool.clone())),
        merchants: Arc::new(PostgresMerchantDirectory::new(
            pool.clone(),
            config.orders.currency()?,
        )),
        customers: Arc::new(PostgresCustomerRepository::new(pool.clone())),
        orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool)),
        prices: Arc::new(CatalogPriceResolver::new(config.orders.default_unit_price()?)),
        notifier: Arc::new(TracingNotifier::new()),
        settings: Arc::new(AppSettings::from_config(&config)?),
    };

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}
