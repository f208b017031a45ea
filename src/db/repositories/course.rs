//! Course repository
//!
//! Database operations for courses and their enrollment set.
//!
//! Authoring queries are ownership-scoped: update and delete match only rows
//! whose owner is the given user, so non-owned ids fall through as not-found.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Course, CourseWithModuleCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Course repository trait
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Create a new course
    async fn create(&self, course: &Course) -> Result<Course>;

    /// Get course by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Course>>;

    /// Get course by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Course>>;

    /// Check whether a course with the given slug exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Get a course only if it is owned by the given user
    async fn get_by_id_for_owner(&self, id: i64, owner_id: i64) -> Result<Option<Course>>;

    /// List courses owned by the given user, newest first
    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Course>>;

    /// Update a course owned by the given user; returns false when no
    /// owned row matched
    async fn update(&self, course: &Course, owner_id: i64) -> Result<bool>;

    /// Delete a course owned by the given user; returns false when no
    /// owned row matched
    async fn delete(&self, id: i64, owner_id: i64) -> Result<bool>;

    /// List all courses with module counts, newest first
    async fn list_with_module_counts(&self) -> Result<Vec<CourseWithModuleCount>>;

    /// List courses of one subject with module counts, newest first
    async fn list_by_subject_with_module_counts(
        &self,
        subject_id: i64,
    ) -> Result<Vec<CourseWithModuleCount>>;

    /// Add a student to the course's enrollment set (idempotent)
    async fn enroll(&self, course_id: i64, student_id: i64) -> Result<()>;

    /// Check whether a student is enrolled in a course
    async fn is_enrolled(&self, course_id: i64, student_id: i64) -> Result<bool>;

    /// List courses the given student is enrolled in, newest first
    async fn list_enrolled(&self, student_id: i64) -> Result<Vec<Course>>;
}

/// SQLx-based course repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCourseRepository {
    pool: DynDatabasePool,
}

impl SqlxCourseRepository {
    /// Create a new SQLx course repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CourseRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CourseRepository for SqlxCourseRepository {
    async fn create(&self, course: &Course) -> Result<Course> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), course).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), course).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Course>> {
        let sql = format!("{} WHERE id = ?", SELECT_COURSE);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_sqlite(self.pool.as_sqlite().unwrap(), &sql, &[Bind::I64(id)]).await
            }
            DatabaseDriver::Mysql => {
                fetch_one_mysql(self.pool.as_mysql().unwrap(), &sql, &[Bind::I64(id)]).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Course>> {
        let sql = format!("{} WHERE slug = ?", SELECT_COURSE);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    &sql,
                    &[Bind::Str(slug.to_string())],
                )
                .await
            }
            DatabaseDriver::Mysql => {
                fetch_one_mysql(
                    self.pool.as_mysql().unwrap(),
                    &sql,
                    &[Bind::Str(slug.to_string())],
                )
                .await
            }
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        Ok(self.get_by_slug(slug).await?.is_some())
    }

    async fn get_by_id_for_owner(&self, id: i64, owner_id: i64) -> Result<Option<Course>> {
        let sql = format!("{} WHERE id = ? AND owner_id = ?", SELECT_COURSE);
        let binds = [Bind::I64(id), Bind::I64(owner_id)];
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_sqlite(self.pool.as_sqlite().unwrap(), &sql, &binds).await
            }
            DatabaseDriver::Mysql => {
                fetch_one_mysql(self.pool.as_mysql().unwrap(), &sql, &binds).await
            }
        }
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Course>> {
        let sql = format!(
            "{} WHERE owner_id = ? ORDER BY created_at DESC",
            SELECT_COURSE
        );
        let binds = [Bind::I64(owner_id)];
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_all_sqlite(self.pool.as_sqlite().unwrap(), &sql, &binds).await
            }
            DatabaseDriver::Mysql => {
                fetch_all_mysql(self.pool.as_mysql().unwrap(), &sql, &binds).await
            }
        }
    }

    async fn update(&self, course: &Course, owner_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_sqlite(self.pool.as_sqlite().unwrap(), course, owner_id).await
            }
            DatabaseDriver::Mysql => {
                update_mysql(self.pool.as_mysql().unwrap(), course, owner_id).await
            }
        }
    }

    async fn delete(&self, id: i64, owner_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_sqlite(self.pool.as_sqlite().unwrap(), id, owner_id).await
            }
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id, owner_id).await,
        }
    }

    async fn list_with_module_counts(&self) -> Result<Vec<CourseWithModuleCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_counts_sqlite(self.pool.as_sqlite().unwrap(), None).await
            }
            DatabaseDriver::Mysql => list_counts_mysql(self.pool.as_mysql().unwrap(), None).await,
        }
    }

    async fn list_by_subject_with_module_counts(
        &self,
        subject_id: i64,
    ) -> Result<Vec<CourseWithModuleCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_counts_sqlite(self.pool.as_sqlite().unwrap(), Some(subject_id)).await
            }
            DatabaseDriver::Mysql => {
                list_counts_mysql(self.pool.as_mysql().unwrap(), Some(subject_id)).await
            }
        }
    }

    async fn enroll(&self, course_id: i64, student_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    "INSERT OR IGNORE INTO enrollments (course_id, student_id) VALUES (?, ?)",
                )
                .bind(course_id)
                .bind(student_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to enroll student")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    "INSERT IGNORE INTO enrollments (course_id, student_id) VALUES (?, ?)",
                )
                .bind(course_id)
                .bind(student_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to enroll student")?;
            }
        }
        Ok(())
    }

    async fn is_enrolled(&self, course_id: i64, student_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS n FROM enrollments WHERE course_id = ? AND student_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(course_id)
                .bind(student_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to check enrollment")?
                .get("n"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(course_id)
                .bind(student_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to check enrollment")?
                .get("n"),
        };
        Ok(count > 0)
    }

    async fn list_enrolled(&self, student_id: i64) -> Result<Vec<Course>> {
        let sql = "SELECT c.id, c.owner_id, c.subject_id, c.title, c.slug, c.overview, c.created_at \
                   FROM courses c \
                   JOIN enrollments e ON e.course_id = c.id \
                   WHERE e.student_id = ? \
                   ORDER BY c.created_at DESC";
        let binds = [Bind::I64(student_id)];
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_all_sqlite(self.pool.as_sqlite().unwrap(), sql, &binds).await
            }
            DatabaseDriver::Mysql => {
                fetch_all_mysql(self.pool.as_mysql().unwrap(), sql, &binds).await
            }
        }
    }
}

const SELECT_COURSE: &str =
    "SELECT id, owner_id, subject_id, title, slug, overview, created_at FROM courses";

const LIST_COUNTS_SQL: &str = r#"
    SELECT c.id, c.owner_id, c.subject_id, c.title, c.slug, c.overview, c.created_at,
           COUNT(m.id) AS total_modules
    FROM courses c
    LEFT JOIN modules m ON m.course_id = c.id
"#;

const LIST_COUNTS_TAIL: &str = r#"
    GROUP BY c.id, c.owner_id, c.subject_id, c.title, c.slug, c.overview, c.created_at
    ORDER BY c.created_at DESC
"#;

/// Bind value for the shared query helpers
enum Bind {
    I64(i64),
    Str(String),
}

// SQLite implementations

async fn create_sqlite(pool: &SqlitePool, course: &Course) -> Result<Course> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO courses (owner_id, subject_id, title, slug, overview, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(course.owner_id)
    .bind(course.subject_id)
    .bind(&course.title)
    .bind(&course.slug)
    .bind(&course.overview)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create course")?;

    Ok(Course {
        id: result.last_insert_rowid(),
        owner_id: course.owner_id,
        subject_id: course.subject_id,
        title: course.title.clone(),
        slug: course.slug.clone(),
        overview: course.overview.clone(),
        created_at: now,
    })
}

async fn fetch_one_sqlite(pool: &SqlitePool, sql: &str, binds: &[Bind]) -> Result<Option<Course>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            Bind::I64(v) => query.bind(v),
            Bind::Str(v) => query.bind(v),
        };
    }
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get course")?;
    Ok(row.map(|r| row_to_course_sqlite(&r)))
}

async fn fetch_all_sqlite(pool: &SqlitePool, sql: &str, binds: &[Bind]) -> Result<Vec<Course>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            Bind::I64(v) => query.bind(v),
            Bind::Str(v) => query.bind(v),
        };
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list courses")?;
    Ok(rows.iter().map(row_to_course_sqlite).collect())
}

async fn update_sqlite(pool: &SqlitePool, course: &Course, owner_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE courses SET subject_id = ?, title = ?, slug = ?, overview = ? \
         WHERE id = ? AND owner_id = ?",
    )
    .bind(course.subject_id)
    .bind(&course.title)
    .bind(&course.slug)
    .bind(&course.overview)
    .bind(course.id)
    .bind(owner_id)
    .execute(pool)
    .await
    .context("Failed to update course")?;

    Ok(result.rows_affected() > 0)
}

async fn delete_sqlite(pool: &SqlitePool, id: i64, owner_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ? AND owner_id = ?")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await
        .context("Failed to delete course")?;

    Ok(result.rows_affected() > 0)
}

async fn list_counts_sqlite(
    pool: &SqlitePool,
    subject_id: Option<i64>,
) -> Result<Vec<CourseWithModuleCount>> {
    let sql = match subject_id {
        Some(_) => format!("{} WHERE c.subject_id = ? {}", LIST_COUNTS_SQL, LIST_COUNTS_TAIL),
        None => format!("{} {}", LIST_COUNTS_SQL, LIST_COUNTS_TAIL),
    };

    let mut query = sqlx::query(&sql);
    if let Some(id) = subject_id {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list courses with module counts")?;

    Ok(rows
        .iter()
        .map(|r| CourseWithModuleCount {
            course: row_to_course_sqlite(r),
            total_modules: r.get("total_modules"),
        })
        .collect())
}

fn row_to_course_sqlite(row: &sqlx::sqlite::SqliteRow) -> Course {
    Course {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        subject_id: row.get("subject_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        overview: row.get("overview"),
        created_at: row.get("created_at"),
    }
}

// MySQL implementations

async fn create_mysql(pool: &MySqlPool, course: &Course) -> Result<Course> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO courses (owner_id, subject_id, title, slug, overview, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(course.owner_id)
    .bind(course.subject_id)
    .bind(&course.title)
    .bind(&course.slug)
    .bind(&course.overview)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create course")?;

    Ok(Course {
        id: result.last_insert_id() as i64,
        owner_id: course.owner_id,
        subject_id: course.subject_id,
        title: course.title.clone(),
        slug: course.slug.clone(),
        overview: course.overview.clone(),
        created_at: now,
    })
}

async fn fetch_one_mysql(pool: &MySqlPool, sql: &str, binds: &[Bind]) -> Result<Option<Course>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            Bind::I64(v) => query.bind(v),
            Bind::Str(v) => query.bind(v),
        };
    }
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get course")?;
    Ok(row.map(|r| row_to_course_mysql(&r)))
}

async fn fetch_all_mysql(pool: &MySqlPool, sql: &str, binds: &[Bind]) -> Result<Vec<Course>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match bind {
            Bind::I64(v) => query.bind(v),
            Bind::Str(v) => query.bind(v),
        };
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list courses")?;
    Ok(rows.iter().map(row_to_course_mysql).collect())
}

async fn update_mysql(pool: &MySqlPool, course: &Course, owner_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE courses SET subject_id = ?, title = ?, slug = ?, overview = ? \
         WHERE id = ? AND owner_id = ?",
    )
    .bind(course.subject_id)
    .bind(&course.title)
    .bind(&course.slug)
    .bind(&course.overview)
    .bind(course.id)
    .bind(owner_id)
    .execute(pool)
    .await
    .context("Failed to update course")?;

    Ok(result.rows_affected() > 0)
}

async fn delete_mysql(pool: &MySqlPool, id: i64, owner_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ? AND owner_id = ?")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await
        .context("Failed to delete course")?;

    Ok(result.rows_affected() > 0)
}

async fn list_counts_mysql(
    pool: &MySqlPool,
    subject_id: Option<i64>,
) -> Result<Vec<CourseWithModuleCount>> {
    let sql = match subject_id {
        Some(_) => format!("{} WHERE c.subject_id = ? {}", LIST_COUNTS_SQL, LIST_COUNTS_TAIL),
        None => format!("{} {}", LIST_COUNTS_SQL, LIST_COUNTS_TAIL),
    };

    let mut query = sqlx::query(&sql);
    if let Some(id) = subject_id {
        query = query.bind(id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list courses with module counts")?;

    Ok(rows
        .iter()
        .map(|r| CourseWithModuleCount {
            course: row_to_course_mysql(r),
            total_modules: r.get("total_modules"),
        })
        .collect())
}

fn row_to_course_mysql(row: &sqlx::mysql::MySqlRow) -> Course {
    Course {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        subject_id: row.get("subject_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        overview: row.get("overview"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSubjectRepository, SqlxUserRepository, SubjectRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Subject, User};

    async fn setup() -> (SqlxCourseRepository, i64, i64) {
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

        let subjects = SqlxSubjectRepository::new(pool.clone());
        let subject = subjects
            .create(&Subject::new("Math".to_string(), "math".to_string()))
            .await
            .unwrap();

        (SqlxCourseRepository::new(pool), owner.id, subject.id)
    }

    fn course(owner_id: i64, subject_id: i64, slug: &str) -> Course {
        Course::new(
            owner_id,
            subject_id,
            format!("Course {}", slug),
            slug.to_string(),
            "Overview".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let (repo, owner_id, subject_id) = setup().await;

        let created = repo.create(&course(owner_id, subject_id, "algebra")).await.unwrap();
        assert!(created.id > 0);

        let by_slug = repo.get_by_slug("algebra").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);

        let owned = repo
            .get_by_id_for_owner(created.id, owner_id)
            .await
            .unwrap();
        assert!(owned.is_some());

        let not_owned = repo.get_by_id_for_owner(created.id, owner_id + 1).await.unwrap();
        assert!(not_owned.is_none());
    }

    #[tokio::test]
    async fn test_update_scoped_to_owner() {
        let (repo, owner_id, subject_id) = setup().await;

        let mut created = repo.create(&course(owner_id, subject_id, "algebra")).await.unwrap();
        created.title = "New title".to_string();

        // A different caller cannot update the course
        assert!(!repo.update(&created, owner_id + 1).await.unwrap());

        assert!(repo.update(&created, owner_id).await.unwrap());
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "New title");
    }

    #[tokio::test]
    async fn test_delete_scoped_to_owner() {
        let (repo, owner_id, subject_id) = setup().await;

        let created = repo.create(&course(owner_id, subject_id, "algebra")).await.unwrap();

        assert!(!repo.delete(created.id, owner_id + 1).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_some());

        assert!(repo.delete(created.id, owner_id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_enrollment_is_idempotent() {
        let (repo, owner_id, subject_id) = setup().await;

        let created = repo.create(&course(owner_id, subject_id, "algebra")).await.unwrap();

        repo.enroll(created.id, owner_id).await.unwrap();
        repo.enroll(created.id, owner_id).await.unwrap();

        assert!(repo.is_enrolled(created.id, owner_id).await.unwrap());

        let enrolled = repo.list_enrolled(owner_id).await.unwrap();
        assert_eq!(enrolled.len(), 1);
    }

    #[tokio::test]
    async fn test_list_by_subject_with_module_counts() {
        let (repo, owner_id, subject_id) = setup().await;

        repo.create(&course(owner_id, subject_id, "algebra")).await.unwrap();
        repo.create(&course(owner_id, subject_id, "calculus")).await.unwrap();

        let all = repo.list_with_module_counts().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|c| c.total_modules == 0));

        let filtered = repo
            .list_by_subject_with_module_counts(subject_id)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);

        let none = repo
            .list_by_subject_with_module_counts(subject_id + 1)
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
