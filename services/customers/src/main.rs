//! Customer service HTTP server.

use anyhow::Context;
use customer_service::{Config, CustomerService, build_router};
use std::sync::Arc;
use storefront_core::environment::SystemClock;
use storefront_core::store::{CustomerStore, SessionStore};
use storefront_postgres::{PostgresCustomerStore, PostgresSessionStore};
use storefront_testing::{InMemoryCustomerStore, InMemorySessionStore};
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
                .unwrap_or_else(|_| "info,customer_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting customer service");

    let config = Config::from_env();
    info!(
        address = %config.bind_address(),
        session_ttl_secs = config.session_ttl_secs,
        persistent = config.postgres.is_some(),
        "Configuration loaded"
    );

    let (customers, sessions): (Arc<dyn CustomerStore>, Arc<dyn SessionStore>) =
        match &config.postgres {
            Some(pg) => {
                info!("Connecting to customer database...");
                let pool = storefront_postgres::connect(
                    &pg.url,
                    pg.max_connections,
                    pg.acquire_timeout_secs,
                )
                .await?;
                storefront_postgres::run_migrations(&pool).await?;
                info!("Customer database connected");
                (
                    Arc::new(PostgresCustomerStore::from_pool(pool.clone())),
                    Arc::new(PostgresSessionStore::from_pool(pool)),
                )
            }
            None => {
                warn!("DATABASE_URL not set, customers and sessions are kept in memory");
                (
                    Arc::new(InMemoryCustomerStore::new()),
                    Arc::new(InMemorySessionStore::new()),
                )
            }
        };

    let service = CustomerService::new(
        customers,
        sessions,
        Arc::new(SystemClock),
        config.session_ttl(),
    );
    let app = build_router(service, config.request_timeout());

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
