//! HTTP gateway for ragroute.
//!
//! Exposes the query router over JSON endpoints:
//! `/query`, `/classify`, `/add`, `/search`, `/health`, `/stats` and
//! `/documents`. Built on Axum; every request runs as its own task.

pub mod api;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use ragroute_config::{AppConfig, GatewayConfig};
use ragroute_router::Runtime;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

pub use api::{ApiError, SharedState, api_router};

const BODY_LIMIT: usize = 1024 * 1024;

/// The full application: API routes plus CORS, body limit, and tracing.
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    api_router(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors_layer(&config.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Any origin when none are configured; otherwise exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Build the runtime from `config` and serve until the process exits.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let runtime = Runtime::from_config(&config).await?;
    serve(Arc::new(runtime), &config.gateway, &addr).await
}

/// Serve an already-built runtime.
pub async fn serve(state: SharedState, config: &GatewayConfig, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state, config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
