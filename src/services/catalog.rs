//! Catalog service
//!
//! Implements the public course catalog:
//! - Subject list with per-subject course counts
//! - Course list with per-course module counts, optionally filtered by subject
//! - Course detail (course plus its module outline)
//!
//! Listings are cached under stable keys derived from the filter. A cache
//! miss recomputes and populates; a hit returns the stored value unchanged.
//! Entries expire by TTL only - mutations do not invalidate, so listings may
//! lag behind authoring by at most the configured TTL.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{CourseRepository, ModuleRepository, SubjectRepository};
use crate::models::{Course, CourseWithModuleCount, Module, Subject, SubjectWithCourseCount};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Default cache TTL for catalog listings (1 hour)
const CATALOG_CACHE_TTL_SECS: u64 = 3600;

/// Cache keys
const CACHE_KEY_SUBJECTS: &str = "catalog:subjects";
const CACHE_KEY_ALL_COURSES: &str = "catalog:courses:all";
const CACHE_KEY_SUBJECT_COURSES: &str = "catalog:courses:subject:";

/// Error types for catalog service operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    /// Subject or course not found
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Subject slug already exists
    #[error("Subject slug already exists: {0}")]
    DuplicateSlug(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Catalog service for public browsing
pub struct CatalogService {
    subject_repo: Arc<dyn SubjectRepository>,
    course_repo: Arc<dyn CourseRepository>,
    module_repo: Arc<dyn ModuleRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CatalogService {
    /// Create a new catalog service
    pub fn new(
        subject_repo: Arc<dyn SubjectRepository>,
        course_repo: Arc<dyn CourseRepository>,
        module_repo: Arc<dyn ModuleRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            subject_repo,
            course_repo,
            module_repo,
            cache,
            cache_ttl: Duration::from_secs(CATALOG_CACHE_TTL_SECS),
        }
    }

    /// Create a new catalog service with custom cache TTL
    pub fn with_cache_ttl(
        subject_repo: Arc<dyn SubjectRepository>,
        course_repo: Arc<dyn CourseRepository>,
        module_repo: Arc<dyn ModuleRepository>,
        cache: Arc<Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            subject_repo,
            course_repo,
            module_repo,
            cache,
            cache_ttl,
        }
    }

    /// List all subjects with course counts (cached)
    pub async fn list_subjects(
        &self,
    ) -> Result<Vec<SubjectWithCourseCount>, CatalogServiceError> {
        if let Some(subjects) = self
            .cache
            .get::<Vec<SubjectWithCourseCount>>(CACHE_KEY_SUBJECTS)
            .await
            .ok()
            .flatten()
        {
            return Ok(subjects);
        }

        let subjects = self
            .subject_repo
            .list_with_course_counts()
            .await
            .context("Failed to list subjects")?;

        let _ = self
            .cache
            .set(CACHE_KEY_SUBJECTS, &subjects, self.cache_ttl)
            .await;

        Ok(subjects)
    }

    /// List courses with module counts, optionally filtered by subject slug
    /// (cached per filter).
    ///
    /// Returns the resolved subject (when a filter was given) together with
    /// the course list.
    pub async fn list_courses(
        &self,
        subject_slug: Option<&str>,
    ) -> Result<(Option<Subject>, Vec<CourseWithModuleCount>), CatalogServiceError> {
        match subject_slug {
            Some(slug) => {
                let subject = self
                    .subject_repo
                    .get_by_slug(slug)
                    .await
                    .context("Failed to get subject")?
                    .ok_or(CatalogServiceError::NotFound("Subject"))?;

                let cache_key = format!("{}{}", CACHE_KEY_SUBJECT_COURSES, subject.id);
                if let Some(courses) = self
                    .cache
                    .get::<Vec<CourseWithModuleCount>>(&cache_key)
                    .await
                    .ok()
                    .flatten()
                {
                    return Ok((Some(subject), courses));
                }

                let courses = self
                    .course_repo
                    .list_by_subject_with_module_counts(subject.id)
                    .await
                    .context("Failed to list courses by subject")?;

                let _ = self.cache.set(&cache_key, &courses, self.cache_ttl).await;

                Ok((Some(subject), courses))
            }
            None => {
                if let Some(courses) = self
                    .cache
                    .get::<Vec<CourseWithModuleCount>>(CACHE_KEY_ALL_COURSES)
                    .await
                    .ok()
                    .flatten()
                {
                    return Ok((None, courses));
                }

                let courses = self
                    .course_repo
                    .list_with_module_counts()
                    .await
                    .context("Failed to list courses")?;

                let _ = self
                    .cache
                    .set(CACHE_KEY_ALL_COURSES, &courses, self.cache_ttl)
                    .await;

                Ok((None, courses))
            }
        }
    }

    /// Course detail by slug: the course and its module outline.
    ///
    /// Module contents stay enrollment-gated; the outline (titles and
    /// positions) is public so a visitor can decide whether to enroll.
    pub async fn course_detail(
        &self,
        slug: &str,
    ) -> Result<(Course, Vec<Module>), CatalogServiceError> {
        let course = self
            .course_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get course")?
            .ok_or(CatalogServiceError::NotFound("Course"))?;

        let modules = self
            .module_repo
            .list_by_course(course.id)
            .await
            .context("Failed to list modules")?;

        Ok((course, modules))
    }

    /// Create a subject (instructor utility; listings catch up after TTL)
    pub async fn create_subject(
        &self,
        title: String,
        slug: String,
    ) -> Result<Subject, CatalogServiceError> {
        if title.trim().is_empty() {
            return Err(CatalogServiceError::ValidationError(
                "title: must not be empty".to_string(),
            ));
        }

        if self
            .subject_repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check subject slug")?
        {
            return Err(CatalogServiceError::DuplicateSlug(slug));
        }

        let created = self
            .subject_repo
            .create(&Subject::new(title, slug))
            .await
            .context("Failed to create subject")?;

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{
        SqlxCourseRepository, SqlxModuleRepository, SqlxSubjectRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Course, User};

    struct Fixture {
        service: CatalogService,
        course_repo: Arc<dyn CourseRepository>,
        owner_id: i64,
        math_id: i64,
    }

    async fn setup() -> Fixture {
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
        let course_repo = SqlxCourseRepository::boxed(pool.clone());
        let module_repo = SqlxModuleRepository::boxed(pool.clone());
        let cache = Arc::new(Cache::Memory(MemoryCache::new()));

        let service = CatalogService::new(
            subject_repo,
            course_repo.clone(),
            module_repo,
            cache,
        );

        let math = service
            .create_subject("Math".to_string(), "math".to_string())
            .await
            .unwrap();
        let music = service
            .create_subject("Music".to_string(), "music".to_string())
            .await
            .unwrap();

        for (subject_id, slug) in [(math.id, "algebra"), (math.id, "calculus"), (music.id, "jazz")]
        {
            course_repo
                .create(&Course::new(
                    owner.id,
                    subject_id,
                    slug.to_string(),
                    slug.to_string(),
                    "Overview".to_string(),
                ))
                .await
                .unwrap();
        }

        Fixture {
            service,
            course_repo,
            owner_id: owner.id,
            math_id: math.id,
        }
    }

    #[tokio::test]
    async fn test_subject_list_includes_counts() {
        let f = setup().await;

        let subjects = f.service.list_subjects().await.unwrap();
        assert_eq!(subjects.len(), 2);
        // Ordered by title: Math before Music
        assert_eq!(subjects[0].subject.slug, "math");
        assert_eq!(subjects[0].total_courses, 2);
        assert_eq!(subjects[1].total_courses, 1);
    }

    #[tokio::test]
    async fn test_course_list_filtered_by_subject() {
        let f = setup().await;

        let (subject, courses) = f.service.list_courses(Some("math")).await.unwrap();
        assert_eq!(subject.unwrap().id, f.math_id);
        assert_eq!(courses.len(), 2);
        assert!(courses.iter().all(|c| c.course.subject_id == f.math_id));

        let (none, all) = f.service.list_courses(None).await.unwrap();
        assert!(none.is_none());
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_subject_slug_is_not_found() {
        let f = setup().await;

        let err = f.service.list_courses(Some("history")).await.unwrap_err();
        assert!(matches!(err, CatalogServiceError::NotFound("Subject")));
    }

    #[tokio::test]
    async fn test_listing_is_served_from_cache() {
        let f = setup().await;

        // Prime the cache
        let (_, before) = f.service.list_courses(None).await.unwrap();
        assert_eq!(before.len(), 3);

        // A mutation after priming is not visible until the TTL lapses
        f.course_repo
            .create(&Course::new(
                f.owner_id,
                f.math_id,
                "Geometry".to_string(),
                "geometry".to_string(),
                "Overview".to_string(),
            ))
            .await
            .unwrap();

        let (_, after) = f.service.list_courses(None).await.unwrap();
        assert_eq!(after.len(), 3);
    }

    #[tokio::test]
    async fn test_course_detail_by_slug() {
        let f = setup().await;

        let (course, modules) = f.service.course_detail("algebra").await.unwrap();
        assert_eq!(course.slug, "algebra");
        assert!(modules.is_empty());

        let err = f.service.course_detail("missing").await.unwrap_err();
        assert!(matches!(err, CatalogServiceError::NotFound("Course")));
    }
}
