//! Course service
//!
//! Implements the instructor-side course lifecycle. Every operation is
//! ownership-scoped: the authenticated caller is injected as owner at create
//! time, and list/update/delete only ever touch rows the caller owns. The
//! scoping composes with the authentication middleware, so no handler
//! duplicates the checks.

use crate::db::repositories::{CourseRepository, SubjectRepository};
use crate::models::{Course, CreateCourseInput, UpdateCourseInput};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Slugs: lowercase alphanumeric runs separated by single hyphens
static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("invalid slug regex"));

/// Error types for course service operations
#[derive(Debug, thiserror::Error)]
pub enum CourseServiceError {
    /// Course not found (or not owned by the caller)
    #[error("Course not found")]
    NotFound,

    /// Subject does not exist
    #[error("Subject not found: {0}")]
    SubjectNotFound(i64),

    /// Course slug already exists
    #[error("Course slug already exists: {0}")]
    DuplicateSlug(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Course service for instructor-side authoring
pub struct CourseService {
    course_repo: Arc<dyn CourseRepository>,
    subject_repo: Arc<dyn SubjectRepository>,
}

impl CourseService {
    /// Create a new course service
    pub fn new(
        course_repo: Arc<dyn CourseRepository>,
        subject_repo: Arc<dyn SubjectRepository>,
    ) -> Self {
        Self {
            course_repo,
            subject_repo,
        }
    }

    /// Create a course owned by the given user
    pub async fn create(
        &self,
        owner_id: i64,
        input: CreateCourseInput,
    ) -> Result<Course, CourseServiceError> {
        if input.title.trim().is_empty() {
            return Err(CourseServiceError::ValidationError(
                "title: must not be empty".to_string(),
            ));
        }

        let slug = match input.slug {
            Some(slug) => {
                if !SLUG_RE.is_match(&slug) {
                    return Err(CourseServiceError::ValidationError(format!(
                        "slug: '{}' is not a valid slug",
                        slug
                    )));
                }
                slug
            }
            None => generate_slug(&input.title),
        };

        if slug.is_empty() {
            return Err(CourseServiceError::ValidationError(
                "slug: could not derive a slug from the title".to_string(),
            ));
        }

        if self
            .subject_repo
            .get_by_id(input.subject_id)
            .await
            .context("Failed to check subject")?
            .is_none()
        {
            return Err(CourseServiceError::SubjectNotFound(input.subject_id));
        }

        if self
            .course_repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(CourseServiceError::DuplicateSlug(slug));
        }

        let course = Course::new(owner_id, input.subject_id, input.title, slug, input.overview);

        let created = self
            .course_repo
            .create(&course)
            .await
            .context("Failed to create course")?;

        Ok(created)
    }

    /// List courses owned by the given user, newest first
    pub async fn list_owned(&self, owner_id: i64) -> Result<Vec<Course>, CourseServiceError> {
        let courses = self
            .course_repo
            .list_by_owner(owner_id)
            .await
            .context("Failed to list owned courses")?;
        Ok(courses)
    }

    /// Get a course owned by the given user
    pub async fn get_owned(&self, id: i64, owner_id: i64) -> Result<Course, CourseServiceError> {
        self.course_repo
            .get_by_id_for_owner(id, owner_id)
            .await
            .context("Failed to get course")?
            .ok_or(CourseServiceError::NotFound)
    }

    /// Update a course owned by the given user
    pub async fn update(
        &self,
        id: i64,
        owner_id: i64,
        input: UpdateCourseInput,
    ) -> Result<Course, CourseServiceError> {
        let mut course = self.get_owned(id, owner_id).await?;

        if let Some(subject_id) = input.subject_id {
            if self
                .subject_repo
                .get_by_id(subject_id)
                .await
                .context("Failed to check subject")?
                .is_none()
            {
                return Err(CourseServiceError::SubjectNotFound(subject_id));
            }
            course.subject_id = subject_id;
        }

        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(CourseServiceError::ValidationError(
                    "title: must not be empty".to_string(),
                ));
            }
            course.title = title;
        }

        if let Some(slug) = input.slug {
            if !SLUG_RE.is_match(&slug) {
                return Err(CourseServiceError::ValidationError(format!(
                    "slug: '{}' is not a valid slug",
                    slug
                )));
            }
            if slug != course.slug
                && self
                    .course_repo
                    .exists_by_slug(&slug)
                    .await
                    .context("Failed to check slug uniqueness")?
            {
                return Err(CourseServiceError::DuplicateSlug(slug));
            }
            course.slug = slug;
        }

        if let Some(overview) = input.overview {
            course.overview = overview;
        }

        let updated = self
            .course_repo
            .update(&course, owner_id)
            .await
            .context("Failed to update course")?;
        if !updated {
            return Err(CourseServiceError::NotFound);
        }

        Ok(course)
    }

    /// Delete a course owned by the given user
    pub async fn delete(&self, id: i64, owner_id: i64) -> Result<(), CourseServiceError> {
        let deleted = self
            .course_repo
            .delete(id, owner_id)
            .await
            .context("Failed to delete course")?;
        if !deleted {
            return Err(CourseServiceError::NotFound);
        }
        Ok(())
    }
}

/// Generate a URL-friendly slug from a title
///
/// Converts the title to lowercase, replaces runs of non-alphanumeric
/// characters with single hyphens and trims hyphens from the ends.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::new();
    let mut prev_hyphen = true; // suppress leading hyphen

    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
    }

    result.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCourseRepository, SqlxSubjectRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::Subject;
    use crate::models::User;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};

    async fn setup() -> (DynDatabasePool, CourseService, i64, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::new(pool.clone());
        let owner = users
            .create(&User::new(
                "teacher".to_string(),
                "teacher@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        let subject_repo = SqlxSubjectRepository::boxed(pool.clone());
        let subject = subject_repo
            .create(&Subject::new("Math".to_string(), "math".to_string()))
            .await
            .unwrap();

        let service = CourseService::new(SqlxCourseRepository::boxed(pool.clone()), subject_repo);

        (pool, service, owner.id, subject.id)
    }

    fn input(subject_id: i64, slug: Option<&str>) -> CreateCourseInput {
        CreateCourseInput {
            subject_id,
            title: "Linear Algebra".to_string(),
            slug: slug.map(String::from),
            overview: "Vectors".to_string(),
        }
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  Rust 101!  "), "rust-101");
        assert_eq!(generate_slug("a--b"), "a-b");
    }

    #[tokio::test]
    async fn test_create_injects_owner() {
        let (_pool, service, owner_id, subject_id) = setup().await;

        let course = service
            .create(owner_id, input(subject_id, Some("linear-algebra")))
            .await
            .unwrap();
        assert_eq!(course.owner_id, owner_id);
        assert_eq!(course.slug, "linear-algebra");
    }

    #[tokio::test]
    async fn test_create_generates_slug_when_missing() {
        let (_pool, service, owner_id, subject_id) = setup().await;

        let course = service.create(owner_id, input(subject_id, None)).await.unwrap();
        assert_eq!(course.slug, "linear-algebra");
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_slug() {
        let (_pool, service, owner_id, subject_id) = setup().await;

        service
            .create(owner_id, input(subject_id, Some("linear-algebra")))
            .await
            .unwrap();
        let err = service
            .create(owner_id, input(subject_id, Some("linear-algebra")))
            .await
            .unwrap_err();
        assert!(matches!(err, CourseServiceError::DuplicateSlug(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_subject() {
        let (_pool, service, owner_id, subject_id) = setup().await;

        let err = service
            .create(owner_id, input(subject_id + 99, Some("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, CourseServiceError::SubjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete_are_owner_scoped() {
        let (_pool, service, owner_id, subject_id) = setup().await;

        let course = service
            .create(owner_id, input(subject_id, Some("linear-algebra")))
            .await
            .unwrap();

        let err = service
            .update(
                course.id,
                owner_id + 1,
                UpdateCourseInput {
                    title: Some("Hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CourseServiceError::NotFound));

        let err = service.delete(course.id, owner_id + 1).await.unwrap_err();
        assert!(matches!(err, CourseServiceError::NotFound));

        let updated = service
            .update(
                course.id,
                owner_id,
                UpdateCourseInput {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");

        service.delete(course.id, owner_id).await.unwrap();
        assert!(service.list_owned(owner_id).await.unwrap().is_empty());
    }
}
