//! Order service HTTP server.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use order_service::{
    AppState, Config, CustomerServiceAuthenticator, HttpCustomerLookup, RouterConfig,
    build_router, metrics::register_order_metrics,
};
use std::sync::Arc;
use storefront_core::environment::SystemClock;
use storefront_core::store::OrderStore;
use storefront_postgres::PostgresOrderStore;
use storefront_testing::InMemoryOrderStore;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,order_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting order service");

    let config = Config::from_env()?;
    info!(
        address = %config.bind_address(),
        customer_service = %config.customer_service.base_url,
        persistent = config.postgres.is_some(),
        "Configuration loaded"
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    register_order_metrics();

    let store: Arc<dyn OrderStore> = match &config.postgres {
        Some(pg) => {
            info!("Connecting to order database...");
            let pool = storefront_postgres::connect(&pg.url, pg.max_connections, pg.acquire_timeout_secs)
                .await?;
            storefront_postgres::run_migrations(&pool).await?;
            info!("Order database connected");
            Arc::new(PostgresOrderStore::from_pool(pool))
        }
        None => {
            warn!("DATABASE_URL not set, orders are kept in memory");
            Arc::new(InMemoryOrderStore::new())
        }
    };

    let lookup = Arc::new(HttpCustomerLookup::new(
        config.customer_service.base_url.clone(),
        config.customer_service.timeout(),
    )?);

    let state = AppState::new(store, lookup.clone(), Arc::new(SystemClock));
    let app = build_router(
        state,
        RouterConfig {
            authenticator: Arc::new(CustomerServiceAuthenticator::new(lookup)),
            price_routes: config.role_routes()?,
            request_timeout: config.request_timeout(),
            metrics: Some(metrics),
        },
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
