//! Student API endpoints
//!
//! - Enrolling in a course
//! - Listing the caller's enrolled courses
//! - Reading a course's module contents (enrolled students only)

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{ContentResponse, EnrolledResponse};
use crate::models::{Course, Module};

/// Build the student router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/student/enroll", post(enroll))
        .route("/student/courses", get(list_my_courses))
        .route("/student/courses/{id}", get(course_content))
}

/// Enrollment request: the course id travels in the body, like the hidden
/// course field of the original enroll form
#[derive(Debug, Deserialize)]
struct EnrollRequest {
    course: i64,
}

#[derive(Debug, Serialize)]
struct MyCoursesResponse {
    courses: Vec<Course>,
}

#[derive(Debug, Deserialize)]
struct CourseContentQuery {
    /// Selected module; defaults to the course's first module
    module: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CourseContentResponse {
    course: Course,
    modules: Vec<Module>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_module: Option<Module>,
    contents: Vec<ContentResponse>,
}

/// POST /api/v1/student/enroll - Enroll the caller in a course
///
/// Already-enrolled is not an error; the enrollment set keeps one
/// membership per (student, course) pair.
async fn enroll(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<EnrollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.enrollment_service.enroll(body.course, user.0.id).await?;
    Ok(Json(EnrolledResponse { enrolled: true }))
}

/// GET /api/v1/student/courses - Courses the caller is enrolled in
async fn list_my_courses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state.enrollment_service.list_courses(user.0.id).await?;
    Ok(Json(MyCoursesResponse { courses }))
}

/// GET /api/v1/student/courses/:id?module=N - Module contents for an
/// enrolled student
async fn course_content(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(course_id): Path<i64>,
    Query(query): Query<CourseContentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .enrollment_service
        .course_content(course_id, user.0.id, query.module)
        .await?;

    let (current_module, contents) = match view.current {
        Some((module, contents)) => (
            Some(module),
            contents.into_iter().map(Into::into).collect(),
        ),
        None => (None, Vec::new()),
    };

    Ok(Json(CourseContentResponse {
        course: view.course,
        modules: view.modules,
        current_module,
        contents,
    }))
}
