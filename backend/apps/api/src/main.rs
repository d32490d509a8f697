//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request-level errors are rendered by
//! the edge crate through `kernel::error::AppError`.

use anyhow::Context;
use axum::{
    Router,
    http::{self, Method, header},
    routing::get,
};
use base64::Engine;
use base64::engine::general_purpose;
use edge::store::SessionStore;
use edge::{EdgeConfig, MemorySessionStore, ReqwestBackendClient, edge_router};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired edge sessions are swept
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,edge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Edge configuration
    let base_config = if cfg!(debug_assertions) {
        EdgeConfig::development()
    } else {
        // In production, load secret from environment
        let secret_b64 = env::var("EDGE_SESSION_SECRET")
            .context("EDGE_SESSION_SECRET must be set in production")?;
        let secret_bytes = Engine::decode(&general_purpose::STANDARD, secret_b64.trim())
            .context("EDGE_SESSION_SECRET is not valid base64")?;
        let session_secret: [u8; 32] = secret_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("EDGE_SESSION_SECRET must decode to 32 bytes"))?;
        EdgeConfig {
            session_secret,
            ..EdgeConfig::default()
        }
    };

    let config = EdgeConfig {
        backend_base_url: env::var("BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        ..base_config
    };

    tracing::info!(backend = %config.backend_base_url, "Edge proxy configured");

    let store = MemorySessionStore::new();
    let backend = ReqwestBackendClient::new(&config).context("Failed to build backend client")?;

    // Periodic cleanup: remove expired sessions
    // Errors here should not stop the server
    let store_for_cleanup = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = store_for_cleanup.cleanup_expired().await {
                tracing::warn!(error = %e, "Edge session cleanup failed, continuing anyway");
            }
        }
    });

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = health_router()
        .nest("/api", edge_router(store, backend, config))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("EDGE_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()
        .context("EDGE_BIND_ADDR must be a socket address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn health_router() -> Router {
    Router::new().route("/health", get(health))
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}
