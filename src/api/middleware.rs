//! API middleware
//!
//! Contains middleware for:
//! - Authentication (session token validation)
//! - The shared application state
//! - The JSON error envelope
//!
//! Ownership checks live in the services; the middleware only establishes
//! who the caller is. Composing `require_auth` with owner-scoped service
//! queries gives every authoring endpoint the same scoping without
//! per-handler duplication.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::services::{
    CatalogService, ContentService, CourseService, EnrollmentService, ModuleService, UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub catalog_service: Arc<CatalogService>,
    pub course_service: Arc<CourseService>,
    pub module_service: Arc<ModuleService>,
    pub content_service: Arc<ContentService>,
    pub enrollment_service: Arc<EnrollmentService>,
    pub upload_config: Arc<crate::config::UploadConfig>,
}

/// Authenticated user extracted from request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

// Service error -> API error mappings, shared by all handlers

impl From<crate::services::UserServiceError> for ApiError {
    fn from(err: crate::services::UserServiceError) -> Self {
        use crate::services::UserServiceError::*;
        match err {
            AuthenticationError(msg) => ApiError::unauthorized(msg),
            ValidationError(msg) => ApiError::validation_error(msg),
            UserExists(msg) => ApiError::conflict(msg),
            InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<crate::services::CourseServiceError> for ApiError {
    fn from(err: crate::services::CourseServiceError) -> Self {
        use crate::services::CourseServiceError::*;
        match err {
            NotFound => ApiError::not_found("Course not found"),
            SubjectNotFound(id) => ApiError::validation_error(format!("subject_id: no subject {}", id)),
            DuplicateSlug(slug) => ApiError::conflict(format!("Course slug already exists: {}", slug)),
            ValidationError(msg) => ApiError::validation_error(msg),
            InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<crate::services::ModuleServiceError> for ApiError {
    fn from(err: crate::services::ModuleServiceError) -> Self {
        use crate::services::ModuleServiceError::*;
        match err {
            NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ValidationError(msg) => ApiError::validation_error(msg),
            InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<crate::services::ContentServiceError> for ApiError {
    fn from(err: crate::services::ContentServiceError) -> Self {
        use crate::services::ContentServiceError::*;
        match err {
            NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ValidationError(msg) => ApiError::validation_error(msg),
            InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<crate::services::EnrollmentServiceError> for ApiError {
    fn from(err: crate::services::EnrollmentServiceError) -> Self {
        use crate::services::EnrollmentServiceError::*;
        match err {
            NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            NotEnrolled => ApiError::forbidden("Enroll in this course to view its content"),
            InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

impl From<crate::services::catalog::CatalogServiceError> for ApiError {
    fn from(err: crate::services::catalog::CatalogServiceError) -> Self {
        use crate::services::catalog::CatalogServiceError::*;
        match err {
            NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            DuplicateSlug(slug) => ApiError::conflict(format!("Subject slug already exists: {}", slug)),
            ValidationError(msg) => ApiError::validation_error(msg),
            InternalError(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

/// Extract session token from request
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
///
/// Resolves the session token to a user and stores it in request extensions
/// for handlers to extract.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await
        .map_err(|e| ApiError::internal_error(format!("Session validation failed: {}", e)))?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Extractor for AuthenticatedUser from request extensions
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}
