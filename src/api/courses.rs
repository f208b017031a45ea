//! Course authoring API endpoints
//!
//! Instructor-side CRUD. Every route sits behind `require_auth`; the course
//! service scopes each query to the caller, so a non-owned id behaves
//! exactly like a missing one (404).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Course, CreateCourseInput, UpdateCourseInput};

/// Build the course authoring router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/manage/courses", get(list_owned_courses))
        .route("/manage/courses", post(create_course))
        .route("/manage/courses/{id}", put(update_course))
        .route("/manage/courses/{id}", delete(delete_course))
}

#[derive(Debug, Serialize)]
struct CoursesResponse {
    courses: Vec<Course>,
}

#[derive(Debug, Serialize)]
struct CourseResponse {
    course: Course,
}

/// GET /api/v1/manage/courses - Courses owned by the caller
async fn list_owned_courses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state.course_service.list_owned(user.0.id).await?;
    Ok(Json(CoursesResponse { courses }))
}

/// POST /api/v1/manage/courses - Create a course owned by the caller
async fn create_course(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CreateCourseInput>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state.course_service.create(user.0.id, input).await?;
    Ok((StatusCode::CREATED, Json(CourseResponse { course })))
}

/// PUT /api/v1/manage/courses/:id - Update an owned course
async fn update_course(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCourseInput>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state.course_service.update(id, user.0.id, input).await?;
    Ok(Json(CourseResponse { course }))
}

/// DELETE /api/v1/manage/courses/:id - Delete an owned course
async fn delete_course(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.course_service.delete(id, user.0.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
