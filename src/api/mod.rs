//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the Eduva course platform:
//! - Auth endpoints (register with auto-login, login, logout, me)
//! - Public catalog browsing (subjects, courses, course detail)
//! - Course/module/content authoring (ownership-scoped)
//! - Reorder endpoints for drag-and-drop
//! - Student enrollment and content access
//! - Uploads for image/file content payloads

pub mod auth;
pub mod catalog;
pub mod contents;
pub mod courses;
pub mod middleware;
pub mod modules;
pub mod responses;
pub mod students;
pub mod upload;

#[cfg(test)]
mod tests;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (require a valid session)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/upload", upload::router())
        .merge(catalog::protected_router())
        .merge(courses::router())
        .merge(modules::router())
        .merge(contents::router())
        .merge(students::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .merge(catalog::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let uploads_dir = state.upload_config.path.clone();

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        // Serve uploaded images/files back to browsers
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
