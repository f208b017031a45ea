//! Content authoring API endpoints
//!
//! The polymorphic content surface: the kind name travels in the URL (as the
//! original drag-and-drop UI submits it), the form carries the title plus
//! the one field the kind needs. Creating persists the item first, then the
//! slot; editing an existing item touches the item only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{ContentResponse, SavedResponse};
use crate::models::{
    ContentItem, ContentKind, ContentPayload, CreateContentInput, Module, UpdateContentInput,
};
use crate::services::ContentService;

/// Build the content authoring router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/modules/{id}/contents", get(list_module_contents))
        .route("/modules/{id}/contents/{kind}", post(create_content))
        .route("/contents/items/{kind}/{id}", get(get_content_item))
        .route("/contents/items/{kind}/{id}", put(update_content_item))
        .route("/contents/{id}", delete(delete_content))
        .route("/contents/order", post(reorder_contents))
}

/// Form body for creating or editing a content item.
///
/// Exactly one payload field is expected, matching the kind in the URL;
/// owner, order and timestamps are system-assigned and not accepted here.
#[derive(Debug, Deserialize)]
struct ContentForm {
    title: String,
    body: Option<String>,
    url: Option<String>,
    image_path: Option<String>,
    file_path: Option<String>,
}

impl ContentForm {
    /// Build the typed payload the kind requires, rejecting a missing field
    fn into_payload(self, kind: ContentKind) -> Result<(String, ContentPayload), ApiError> {
        let missing =
            |field: &str| ApiError::validation_error(format!("{}: this field is required", field));

        let payload = match kind {
            ContentKind::Text => ContentPayload::Text {
                body: self.body.ok_or_else(|| missing("body"))?,
            },
            ContentKind::Video => ContentPayload::Video {
                url: self.url.ok_or_else(|| missing("url"))?,
            },
            ContentKind::Image => ContentPayload::Image {
                image_path: self.image_path.ok_or_else(|| missing("image_path"))?,
            },
            ContentKind::File => ContentPayload::File {
                file_path: self.file_path.ok_or_else(|| missing("file_path"))?,
            },
        };

        Ok((self.title, payload))
    }
}

#[derive(Debug, Serialize)]
struct ModuleContentsResponse {
    module: Module,
    contents: Vec<ContentResponse>,
}

#[derive(Debug, Serialize)]
struct ContentItemResponse {
    item: ContentItem,
}

/// GET /api/v1/modules/:id/contents - An owned module's contents
async fn list_module_contents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let (module, contents) = state
        .content_service
        .list_for_owner(module_id, user.0.id)
        .await?;

    Ok(Json(ModuleContentsResponse {
        module,
        contents: contents.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/v1/modules/:id/contents/:kind - Create an item and its slot
async fn create_content(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((module_id, kind)): Path<(i64, String)>,
    Json(form): Json<ContentForm>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = ContentService::resolve_kind(&kind)?;
    let (title, payload) = form.into_payload(kind)?;

    let created = state
        .content_service
        .create(module_id, user.0.id, kind, CreateContentInput { title, payload })
        .await?;

    Ok((StatusCode::CREATED, Json(ContentResponse::from(created))))
}

/// GET /api/v1/contents/items/:kind/:id - Fetch an owned item for editing
async fn get_content_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((kind, item_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = ContentService::resolve_kind(&kind)?;
    let item = state
        .content_service
        .get_item_for_owner(kind, item_id, user.0.id)
        .await?;
    Ok(Json(ContentItemResponse { item }))
}

/// PUT /api/v1/contents/items/:kind/:id - Edit an item in place
///
/// The slot keeps its module and position.
async fn update_content_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((kind, item_id)): Path<(String, i64)>,
    Json(form): Json<ContentForm>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = ContentService::resolve_kind(&kind)?;
    let (title, payload) = form.into_payload(kind)?;

    let item = state
        .content_service
        .update_item(kind, item_id, user.0.id, UpdateContentInput { title, payload })
        .await?;
    Ok(Json(ContentItemResponse { item }))
}

/// DELETE /api/v1/contents/:id - Delete a slot and its item
async fn delete_content(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(content_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.content_service.delete(content_id, user.0.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/contents/order - Bulk reorder `{content_id: new_order}`
async fn reorder_contents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<HashMap<String, i32>>,
) -> Result<impl IntoResponse, ApiError> {
    let order = crate::api::modules::parse_order_map(body);
    state.content_service.reorder(user.0.id, order).await?;
    Ok(Json(SavedResponse::ok()))
}
