//! API layer - HTTP handlers and routing
//!
//! Every endpoint lives under `/api/v1`. Routes come in three groups:
//! - public routes, which still recognise a bearer token when one is sent
//! - protected routes, which require a valid token
//! - admin routes, which also require the admin role

pub mod admin;
pub mod auth;
pub mod collections;
pub mod comments;
pub mod common;
pub mod issues;
pub mod middleware;
pub mod posts;
pub mod private_snippets;
pub mod reactions;
pub mod snippets;
pub mod solutions;
pub mod suggestions;
pub mod tags;
pub mod users;
pub mod votes;

#[cfg(test)]
mod tests;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db;

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .merge(users::protected_router())
        .merge(posts::protected_router())
        .merge(snippets::protected_router())
        .merge(private_snippets::router())
        .merge(issues::protected_router())
        .merge(solutions::protected_router())
        .merge(comments::protected_router())
        .merge(votes::router())
        .merge(reactions::protected_router())
        .merge(tags::protected_router())
        .merge(collections::protected_router())
        .merge(suggestions::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health))
        .merge(users::public_router())
        .merge(posts::public_router())
        .merge(snippets::public_router())
        .merge(issues::public_router())
        .merge(solutions::public_router())
        .merge(comments::public_router())
        .merge(reactions::public_router())
        .merge(tags::public_router())
        .merge(collections::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .merge(public_routes)
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %cors_origin, "Invalid CORS origin, cross-origin requests are disabled");
            cors
        }
    };

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// GET /api/v1/health
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let version = env!("CARGO_PKG_VERSION");
    match db::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "ok",
                version,
            }),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: "unavailable",
                    version,
                }),
            )
        }
    }
}
