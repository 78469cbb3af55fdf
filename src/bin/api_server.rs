// src/bin/api_server.rs

use classifieds::infra::config::StoreBackend;
use classifieds::transport;
use classifieds::{Config, MarketplaceService, MemoryStore, Store, SupabaseStore};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,classifieds=debug")),
        )
        .init();

    let config = Config::from_env()?;

    // --- Store Initialization ---
    let store: Arc<dyn Store> = match &config.backend {
        StoreBackend::Supabase { url, anon_key } => {
            tracing::info!(%url, "using managed store");
            Arc::new(SupabaseStore::new(url.clone(), anon_key.clone()))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new(config.public_base()))
        }
    };
    if let Err(e) = store.ping().await {
        tracing::warn!(error = %e, "store is not reachable yet; /health will report it");
    }

    let service = MarketplaceService::new(store, config.bucket.clone());
    let app_state = transport::http::AppState {
        service: Arc::new(service),
    };

    // --- API Server Initialization ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, bucket = %config.bucket, "API server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui", config.bind_addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
