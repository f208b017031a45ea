//! Module authoring API endpoints
//!
//! - Batch module set editing for a course (one submission creates, edits
//!   and deletes any number of modules)
//! - The drag-and-drop reorder endpoint
//!
//! The reorder endpoint accepts a JSON mapping of module id to new position
//! and answers `{"saved": "OK"}`. Ids that do not resolve to an owned module
//! are skipped silently. Being a JSON API authenticated by session token,
//! it carries no extra CSRF token check.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::SavedResponse;
use crate::models::{Module, ModuleSetInput};

/// Build the module authoring router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/manage/courses/{id}/modules", get(list_modules))
        .route("/manage/courses/{id}/modules", put(update_modules))
        .route("/modules/order", post(reorder_modules))
}

#[derive(Debug, Serialize)]
struct ModulesResponse {
    modules: Vec<Module>,
}

/// GET /api/v1/manage/courses/:id/modules - An owned course's modules
async fn list_modules(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let modules = state
        .module_service
        .list_for_owner(course_id, user.0.id)
        .await?;
    Ok(Json(ModulesResponse { modules }))
}

/// PUT /api/v1/manage/courses/:id/modules - Batch-edit an owned course's module set
async fn update_modules(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(course_id): Path<i64>,
    Json(input): Json<ModuleSetInput>,
) -> Result<impl IntoResponse, ApiError> {
    let modules = state
        .module_service
        .update_course_modules(course_id, user.0.id, input)
        .await?;
    Ok(Json(ModulesResponse { modules }))
}

/// POST /api/v1/modules/order - Bulk reorder `{module_id: new_order}`
async fn reorder_modules(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<HashMap<String, i32>>,
) -> Result<impl IntoResponse, ApiError> {
    let order = parse_order_map(body);
    state.module_service.reorder(user.0.id, order).await?;
    Ok(Json(SavedResponse::ok()))
}

/// Parse a `{id: order}` JSON object. Keys arrive as strings; entries whose
/// key is not an integer are skipped like any other unresolvable id.
pub(crate) fn parse_order_map(body: HashMap<String, i32>) -> HashMap<i64, i32> {
    body.into_iter()
        .filter_map(|(id, order)| id.parse::<i64>().ok().map(|id| (id, order)))
        .collect()
}
