//! # Asset Ledger HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check with record counts
//! - `POST /assets` - Register an asset
//! - `GET /assets/{asset_id}` - Asset with cached location
//! - `GET /assets/{asset_id}/location` - Location resolved from the chain
//! - `GET /assets/{asset_id}/audit` - Chain invariant audit
//! - `POST /assets/{asset_id}/reproject` - Rewrite the cached location
//! - `GET /movements?asset_id=&order=asc|desc` - List movements
//! - `POST /movements` - Create a movement
//! - `GET /movements/{code}` - Get a movement
//! - `PATCH /movements/{code}` - Edit a movement
//! - `DELETE /movements/{code}` - Delete the latest movement of an asset

mod handlers;
mod middleware;
mod types;

pub use handlers::{
    audit_handler, create_movement_handler, delete_movement_handler, edit_movement_handler,
    get_asset_handler, get_movement_handler, health_handler, list_movements_handler,
    location_handler, register_asset_handler, reproject_handler,
};
pub use middleware::{GlobalRateLimiter, create_rate_limiter, rate_limit_middleware};
pub use types::{
    ApiError, AssetResponse, AuditResponse, CreateMovementRequest, EditMovementRequest,
    ErrorResponse, HealthResponse, ListQuery, LocationResponse, MovementListResponse,
    MovementResponse, OrderParam, RegisterAssetRequest, status_for,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use ledger_core::Ledger;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body (1 MiB).
const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the ledger.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

impl AppState {
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from the configured origins.
///
/// - `["*"]`: allows all origins
/// - empty: localhost only
/// - otherwise: the listed origins
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        if !origins.is_empty() {
            tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        }
        return build_localhost_cors();
    }

    cors_for(allowed)
}

/// Restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    cors_for(origins)
}

fn cors_for(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/assets", post(handlers::register_asset_handler))
        .route("/assets/{asset_id}", get(handlers::get_asset_handler))
        .route("/assets/{asset_id}/location", get(handlers::location_handler))
        .route("/assets/{asset_id}/audit", get(handlers::audit_handler))
        .route(
            "/assets/{asset_id}/reproject",
            post(handlers::reproject_handler),
        )
        .route(
            "/movements",
            get(handlers::list_movements_handler).post(handlers::create_movement_handler),
        )
        .route(
            "/movements/{code}",
            get(handlers::get_movement_handler)
                .patch(handlers::edit_movement_handler)
                .delete(handlers::delete_movement_handler),
        );

    if config.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(config.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.cors_origins))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(config: &ServerConfig, ledger: Ledger) -> std::io::Result<()> {
    let router = create_router(AppState::new(ledger), config);
    let addr = config.addr();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Asset ledger HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
