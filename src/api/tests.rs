//! End-to-end API tests
//!
//! Drives the full router over an in-memory SQLite database and memory
//! cache, the way a browser client would: register, author a course,
//! reorder modules, enroll, read content.

use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{build_router, AppState};
use crate::cache::{Cache, MemoryCache};
use crate::db::repositories::{
    SqlxContentRepository, SqlxCourseRepository, SqlxModuleRepository, SqlxSessionRepository,
    SqlxSubjectRepository, SqlxUserRepository,
};
use crate::db::{create_test_pool, migrations};
use crate::services::{
    catalog::CatalogService, content::ContentService, course::CourseService,
    enrollment::EnrollmentService, module::ModuleService, user::UserService,
};

async fn test_server() -> TestServer {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();

    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let subject_repo = SqlxSubjectRepository::boxed(pool.clone());
    let course_repo = SqlxCourseRepository::boxed(pool.clone());
    let module_repo = SqlxModuleRepository::boxed(pool.clone());
    let content_repo = SqlxContentRepository::boxed(pool.clone());

    let cache = Arc::new(Cache::Memory(MemoryCache::new()));

    let state = AppState {
        user_service: Arc::new(UserService::new(user_repo, session_repo)),
        catalog_service: Arc::new(CatalogService::new(
            subject_repo.clone(),
            course_repo.clone(),
            module_repo.clone(),
            cache,
        )),
        course_service: Arc::new(CourseService::new(course_repo.clone(), subject_repo)),
        module_service: Arc::new(ModuleService::new(course_repo.clone(), module_repo.clone())),
        content_service: Arc::new(ContentService::new(module_repo.clone(), content_repo.clone())),
        enrollment_service: Arc::new(EnrollmentService::new(
            course_repo,
            module_repo,
            content_repo,
        )),
        upload_config: Arc::new(crate::config::UploadConfig::default()),
    };

    let app = build_router(state, "http://localhost:3000");
    TestServer::new(app).unwrap()
}

/// Register a user and return their session token
async fn register(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "correcthorse",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

/// Create a subject and return its id
async fn create_subject(server: &TestServer, token: &str, title: &str, slug: &str) -> i64 {
    let response = server
        .post("/api/v1/manage/subjects")
        .authorization_bearer(token)
        .json(&json!({"title": title, "slug": slug}))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    body["subject"]["id"].as_i64().unwrap()
}

/// Create a course and return its id
async fn create_course(server: &TestServer, token: &str, subject_id: i64, slug: &str) -> i64 {
    let response = server
        .post("/api/v1/manage/courses")
        .authorization_bearer(token)
        .json(&json!({
            "subject_id": subject_id,
            "title": format!("Course {}", slug),
            "slug": slug,
            "overview": "Overview",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    body["course"]["id"].as_i64().unwrap()
}

/// Batch-add modules with the given titles, returning (id, sort_order) pairs
async fn add_modules(
    server: &TestServer,
    token: &str,
    course_id: i64,
    titles: &[&str],
) -> Vec<(i64, i64)> {
    let modules: Vec<Value> = titles.iter().map(|t| json!({"title": t})).collect();
    let response = server
        .put(&format!("/api/v1/manage/courses/{}/modules", course_id))
        .authorization_bearer(token)
        .json(&json!({"modules": modules}))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    body["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| (m["id"].as_i64().unwrap(), m["sort_order"].as_i64().unwrap()))
        .collect()
}

#[tokio::test]
async fn test_registration_auto_authenticates() {
    let server = test_server().await;

    let token = register(&server, "ada").await;

    let response = server
        .get("/api/v1/auth/me")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["username"], "ada");
}

#[tokio::test]
async fn test_auth_required_for_authoring() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/manage/courses")
        .json(&json!({"subject_id": 1, "title": "T", "slug": "t", "overview": ""}))
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_module_orders_increase_with_insertion() {
    let server = test_server().await;
    let token = register(&server, "ada").await;
    let subject_id = create_subject(&server, &token, "Math", "math").await;
    let course_id = create_course(&server, &token, subject_id, "algebra").await;

    let modules = add_modules(&server, &token, course_id, &["One", "Two", "Three"]).await;

    let orders: Vec<i64> = modules.iter().map(|(_, order)| *order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_module_reorder_swap_is_exact() {
    let server = test_server().await;
    let token = register(&server, "ada").await;
    let subject_id = create_subject(&server, &token, "Math", "math").await;
    let course_id = create_course(&server, &token, subject_id, "algebra").await;

    let modules = add_modules(&server, &token, course_id, &["One", "Two", "Three"]).await;
    let (first_id, _) = modules[0];
    let (third_id, _) = modules[2];

    // Swap first and third
    let response = server
        .post("/api/v1/modules/order")
        .authorization_bearer(&token)
        .json(&json!({
            (first_id.to_string()): 2,
            (third_id.to_string()): 0,
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["saved"], "OK");

    let response = server
        .get(&format!("/api/v1/manage/courses/{}/modules", course_id))
        .authorization_bearer(&token)
        .await;
    let body: Value = response.json();
    let ids: Vec<i64> = body["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![third_id, modules[1].0, first_id]);
}

#[tokio::test]
async fn test_reorder_ignores_other_owners_modules() {
    let server = test_server().await;
    let owner_token = register(&server, "ada").await;
    let other_token = register(&server, "mallory").await;

    let subject_id = create_subject(&server, &owner_token, "Math", "math").await;
    let course_id = create_course(&server, &owner_token, subject_id, "algebra").await;
    let modules = add_modules(&server, &owner_token, course_id, &["One"]).await;

    // Another user reordering someone else's module gets a success
    // indicator but changes nothing
    let response = server
        .post("/api/v1/modules/order")
        .authorization_bearer(&other_token)
        .json(&json!({ (modules[0].0.to_string()): 9 }))
        .await;
    response.assert_status_ok();

    let response = server
        .get(&format!("/api/v1/manage/courses/{}/modules", course_id))
        .authorization_bearer(&owner_token)
        .await;
    let body: Value = response.json();
    assert_eq!(body["modules"][0]["sort_order"], 0);
}

#[tokio::test]
async fn test_double_enrollment_keeps_single_membership() {
    let server = test_server().await;
    let teacher = register(&server, "teacher").await;
    let student = register(&server, "student").await;

    let subject_id = create_subject(&server, &teacher, "Math", "math").await;
    let course_id = create_course(&server, &teacher, subject_id, "algebra").await;

    for _ in 0..2 {
        let response = server
            .post("/api/v1/student/enroll")
            .authorization_bearer(&student)
            .json(&json!({"course": course_id}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["enrolled"], true);
    }

    let response = server
        .get("/api/v1/student/courses")
        .authorization_bearer(&student)
        .await;
    let body: Value = response.json();
    assert_eq!(body["courses"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_content_access_requires_enrollment() {
    let server = test_server().await;
    let teacher = register(&server, "teacher").await;
    let student = register(&server, "student").await;

    let subject_id = create_subject(&server, &teacher, "Math", "math").await;
    let course_id = create_course(&server, &teacher, subject_id, "algebra").await;
    let modules = add_modules(&server, &teacher, course_id, &["Intro"]).await;

    let response = server
        .post(&format!("/api/v1/modules/{}/contents/text", modules[0].0))
        .authorization_bearer(&teacher)
        .json(&json!({"title": "Lecture", "body": "Welcome"}))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    // Denied before enrollment
    let response = server
        .get(&format!("/api/v1/student/courses/{}", course_id))
        .authorization_bearer(&student)
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);

    server
        .post("/api/v1/student/enroll")
        .authorization_bearer(&student)
        .json(&json!({"course": course_id}))
        .await
        .assert_status_ok();

    // Allowed after enrollment
    let response = server
        .get(&format!("/api/v1/student/courses/{}", course_id))
        .authorization_bearer(&student)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["contents"][0]["item"]["title"], "Lecture");
    assert_eq!(body["contents"][0]["template"], "courses/content/text.html");
}

#[tokio::test]
async fn test_deleting_content_removes_item() {
    let server = test_server().await;
    let token = register(&server, "ada").await;

    let subject_id = create_subject(&server, &token, "Math", "math").await;
    let course_id = create_course(&server, &token, subject_id, "algebra").await;
    let modules = add_modules(&server, &token, course_id, &["Intro"]).await;

    let response = server
        .post(&format!("/api/v1/modules/{}/contents/text", modules[0].0))
        .authorization_bearer(&token)
        .json(&json!({"title": "Lecture", "body": "Welcome"}))
        .await;
    let body: Value = response.json();
    let content_id = body["id"].as_i64().unwrap();
    let item_id = body["item"]["id"].as_i64().unwrap();

    server
        .delete(&format!("/api/v1/contents/{}", content_id))
        .authorization_bearer(&token)
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    // The referenced item is gone too
    let response = server
        .get(&format!("/api/v1/contents/items/text/{}", item_id))
        .authorization_bearer(&token)
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_content_kind_is_rejected() {
    let server = test_server().await;
    let token = register(&server, "ada").await;

    let subject_id = create_subject(&server, &token, "Math", "math").await;
    let course_id = create_course(&server, &token, subject_id, "algebra").await;
    let modules = add_modules(&server, &token, course_id, &["Intro"]).await;

    let response = server
        .post(&format!("/api/v1/modules/{}/contents/audio", modules[0].0))
        .authorization_bearer(&token)
        .json(&json!({"title": "Lecture", "body": "Welcome"}))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_filtering_by_subject() {
    let server = test_server().await;
    let token = register(&server, "ada").await;

    let math_id = create_subject(&server, &token, "Math", "math").await;
    let music_id = create_subject(&server, &token, "Music", "music").await;
    create_course(&server, &token, math_id, "algebra").await;
    create_course(&server, &token, math_id, "calculus").await;
    create_course(&server, &token, music_id, "jazz").await;

    let response = server.get("/api/v1/courses?subject=math").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["courses"].as_array().unwrap().len(), 2);
    assert_eq!(body["subject"]["slug"], "math");

    let response = server.get("/api/v1/courses").await;
    let body: Value = response.json();
    assert_eq!(body["courses"].as_array().unwrap().len(), 3);

    let response = server.get("/api/v1/courses?subject=history").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);

    let response = server.get("/api/v1/subjects").await;
    let body: Value = response.json();
    let math = body["subjects"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["slug"] == "math")
        .unwrap();
    assert_eq!(math["total_courses"], 2);
}

#[tokio::test]
async fn test_course_mutations_are_owner_scoped() {
    let server = test_server().await;
    let owner = register(&server, "ada").await;
    let other = register(&server, "mallory").await;

    let subject_id = create_subject(&server, &owner, "Math", "math").await;
    let course_id = create_course(&server, &owner, subject_id, "algebra").await;

    // Non-owned course behaves like a missing one
    let response = server
        .put(&format!("/api/v1/manage/courses/{}", course_id))
        .authorization_bearer(&other)
        .json(&json!({"title": "Hijacked"}))
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);

    let response = server
        .delete(&format!("/api/v1/manage/courses/{}", course_id))
        .authorization_bearer(&other)
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);

    // Owner listing contains it; the other user's does not
    let response = server
        .get("/api/v1/manage/courses")
        .authorization_bearer(&owner)
        .await;
    let body: Value = response.json();
    assert_eq!(body["courses"].as_array().unwrap().len(), 1);

    let response = server
        .get("/api/v1/manage/courses")
        .authorization_bearer(&other)
        .await;
    let body: Value = response.json();
    assert!(body["courses"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_course_detail_is_public() {
    let server = test_server().await;
    let token = register(&server, "ada").await;

    let subject_id = create_subject(&server, &token, "Math", "math").await;
    let course_id = create_course(&server, &token, subject_id, "algebra").await;
    add_modules(&server, &token, course_id, &["Intro", "Advanced"]).await;

    // No authentication on the detail route
    let response = server.get("/api/v1/courses/algebra").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["course"]["slug"], "algebra");
    assert_eq!(body["modules"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_validation_errors_are_field_level() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "short",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("password"));

    // No partial save: the username is still free
    register(&server, "ada").await;
}
