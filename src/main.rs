//! logistics-gateway server entry point.
//!
//! Loads configuration, selects the storage and object-store backends and
//! starts the Axum HTTP server.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use logistics_gateway::api;
use logistics_gateway::app_state::AppState;
use logistics_gateway::config::{GatewayConfig, LogFormat, StorageBackend};
use logistics_gateway::object_store::{HttpObjectStore, InMemoryObjectStore, ObjectStore};
use logistics_gateway::persistence::Stores;
use logistics_gateway::persistence::memory::InMemoryStore;
use logistics_gateway::persistence::postgres::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, backend = ?config.storage_backend, "starting logistics-gateway");

    // Build persistence layer
    let stores = match config.storage_backend {
        StorageBackend::Postgres => {
            let store = PostgresStore::connect(
                &config.database_url,
                config.database_max_connections,
                config.database_min_connections,
                config.database_connect_timeout(),
            )
            .await
            .context("connecting to PostgreSQL")?;
            store.migrate().await.context("running migrations")?;
            tracing::info!("database migrations applied");
            Stores::from_backend(Arc::new(store))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on restart");
            Stores::from_backend(Arc::new(InMemoryStore::new()))
        }
    };

    // Build object-store collaborator
    let object_store: Arc<dyn ObjectStore> = match &config.object_store_url {
        Some(url) => {
            tracing::info!(url = %url, "using HTTP object store");
            Arc::new(
                HttpObjectStore::new(url.clone(), config.object_store_timeout())
                    .context("building object-store client")?,
            )
        }
        None => {
            tracing::warn!("OBJECT_STORE_URL not set; proof-of-delivery files are kept in memory");
            Arc::new(InMemoryObjectStore::new())
        }
    };

    // Build application state
    let app_state = AppState::new(&stores, object_store, config.gps_policy);

    // Build router
    let app = with_swagger(api::build_router())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

#[cfg(feature = "swagger-ui")]
fn with_swagger(router: Router<AppState>) -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    router.merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::docs::ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn with_swagger(router: Router<AppState>) -> Router<AppState> {
    router
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
