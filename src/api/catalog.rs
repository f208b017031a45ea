//! Catalog API endpoints
//!
//! Public browsing of subjects and courses. Listings are cached by the
//! catalog service; anyone may browse, only enrolled students may read
//! module contents (see `students`).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Course, CourseWithModuleCount, Module, Subject, SubjectWithCourseCount};

/// Build the public catalog router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/subjects", get(list_subjects))
        .route("/courses", get(list_courses))
        .route("/courses/{slug}", get(course_detail))
}

/// Build the authenticated catalog router (subject authoring)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/manage/subjects", post(create_subject))
}

#[derive(Debug, Serialize)]
struct SubjectsResponse {
    subjects: Vec<SubjectWithCourseCount>,
}

#[derive(Debug, Deserialize)]
struct CoursesQuery {
    /// Optional subject slug filter
    subject: Option<String>,
}

#[derive(Debug, Serialize)]
struct CoursesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<Subject>,
    courses: Vec<CourseWithModuleCount>,
}

#[derive(Debug, Serialize)]
struct CourseDetailResponse {
    course: Course,
    modules: Vec<Module>,
}

#[derive(Debug, Deserialize)]
struct CreateSubjectRequest {
    title: String,
    slug: String,
}

#[derive(Debug, Serialize)]
struct SubjectResponse {
    subject: Subject,
}

/// GET /api/v1/subjects - Subject list with course counts (cached)
async fn list_subjects(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let subjects = state.catalog_service.list_subjects().await?;
    Ok(Json(SubjectsResponse { subjects }))
}

/// GET /api/v1/courses?subject=slug - Course list, optionally filtered (cached)
async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CoursesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (subject, courses) = state
        .catalog_service
        .list_courses(query.subject.as_deref())
        .await?;
    Ok(Json(CoursesResponse { subject, courses }))
}

/// GET /api/v1/courses/:slug - Course detail with module outline
async fn course_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (course, modules) = state.catalog_service.course_detail(&slug).await?;
    Ok(Json(CourseDetailResponse { course, modules }))
}

/// POST /api/v1/manage/subjects - Create a subject
async fn create_subject(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let subject = state
        .catalog_service
        .create_subject(body.title, body.slug)
        .await?;
    Ok((StatusCode::CREATED, Json(SubjectResponse { subject })))
}
