//! Subject repository
//!
//! Database operations for subjects, including the catalog's
//! per-subject course counts.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Subject, SubjectWithCourseCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Subject repository trait
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Create a new subject
    async fn create(&self, subject: &Subject) -> Result<Subject>;

    /// Get subject by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Subject>>;

    /// Get subject by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Subject>>;

    /// Check whether a subject with the given slug exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// List all subjects ordered by title
    async fn list(&self) -> Result<Vec<Subject>>;

    /// List all subjects with their course counts, ordered by title
    async fn list_with_course_counts(&self) -> Result<Vec<SubjectWithCourseCount>>;
}

/// SQLx-based subject repository implementation
pub struct SqlxSubjectRepository {
    pool: DynDatabasePool,
}

impl SqlxSubjectRepository {
    /// Create a new SQLx subject repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubjectRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubjectRepository for SqlxSubjectRepository {
    async fn create(&self, subject: &Subject) -> Result<Subject> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), subject).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), subject).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Subject>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Subject>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await,
            DatabaseDriver::Mysql => get_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        Ok(self.get_by_slug(slug).await?.is_some())
    }

    async fn list(&self) -> Result<Vec<Subject>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_with_course_counts(&self) -> Result<Vec<SubjectWithCourseCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_with_counts_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_with_counts_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

const LIST_WITH_COUNTS_SQL: &str = r#"
    SELECT s.id, s.title, s.slug, COUNT(c.id) AS total_courses
    FROM subjects s
    LEFT JOIN courses c ON c.subject_id = s.id
    GROUP BY s.id, s.title, s.slug
    ORDER BY s.title
"#;

// SQLite implementations

async fn create_sqlite(pool: &SqlitePool, subject: &Subject) -> Result<Subject> {
    let result = sqlx::query("INSERT INTO subjects (title, slug) VALUES (?, ?)")
        .bind(&subject.title)
        .bind(&subject.slug)
        .execute(pool)
        .await
        .context("Failed to create subject")?;

    Ok(Subject {
        id: result.last_insert_rowid(),
        title: subject.title.clone(),
        slug: subject.slug.clone(),
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Subject>> {
    let row = sqlx::query("SELECT id, title, slug FROM subjects WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get subject")?;

    Ok(row.map(|r| row_to_subject_sqlite(&r)))
}

async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Subject>> {
    let row = sqlx::query("SELECT id, title, slug FROM subjects WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get subject by slug")?;

    Ok(row.map(|r| row_to_subject_sqlite(&r)))
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Subject>> {
    let rows = sqlx::query("SELECT id, title, slug FROM subjects ORDER BY title")
        .fetch_all(pool)
        .await
        .context("Failed to list subjects")?;

    Ok(rows.iter().map(row_to_subject_sqlite).collect())
}

async fn list_with_counts_sqlite(pool: &SqlitePool) -> Result<Vec<SubjectWithCourseCount>> {
    let rows = sqlx::query(LIST_WITH_COUNTS_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list subjects with course counts")?;

    Ok(rows
        .iter()
        .map(|r| SubjectWithCourseCount {
            subject: row_to_subject_sqlite(r),
            total_courses: r.get("total_courses"),
        })
        .collect())
}

fn row_to_subject_sqlite(row: &sqlx::sqlite::SqliteRow) -> Subject {
    Subject {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
    }
}

// MySQL implementations

async fn create_mysql(pool: &MySqlPool, subject: &Subject) -> Result<Subject> {
    let result = sqlx::query("INSERT INTO subjects (title, slug) VALUES (?, ?)")
        .bind(&subject.title)
        .bind(&subject.slug)
        .execute(pool)
        .await
        .context("Failed to create subject")?;

    Ok(Subject {
        id: result.last_insert_id() as i64,
        title: subject.title.clone(),
        slug: subject.slug.clone(),
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Subject>> {
    let row = sqlx::query("SELECT id, title, slug FROM subjects WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get subject")?;

    Ok(row.map(|r| row_to_subject_mysql(&r)))
}

async fn get_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Subject>> {
    let row = sqlx::query("SELECT id, title, slug FROM subjects WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get subject by slug")?;

    Ok(row.map(|r| row_to_subject_mysql(&r)))
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<Subject>> {
    let rows = sqlx::query("SELECT id, title, slug FROM subjects ORDER BY title")
        .fetch_all(pool)
        .await
        .context("Failed to list subjects")?;

    Ok(rows.iter().map(row_to_subject_mysql).collect())
}

async fn list_with_counts_mysql(pool: &MySqlPool) -> Result<Vec<SubjectWithCourseCount>> {
    let rows = sqlx::query(LIST_WITH_COUNTS_SQL)
        .fetch_all(pool)
        .await
        .context("Failed to list subjects with course counts")?;

    Ok(rows
        .iter()
        .map(|r| SubjectWithCourseCount {
            subject: row_to_subject_mysql(r),
            total_courses: r.get("total_courses"),
        })
        .collect())
}

fn row_to_subject_mysql(row: &sqlx::mysql::MySqlRow) -> Subject {
    Subject {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxSubjectRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxSubjectRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_subject() {
        let repo = setup().await;

        let created = repo
            .create(&Subject::new("Music".to_string(), "music".to_string()))
            .await
            .unwrap();
        assert!(created.id > 0);

        let by_slug = repo.get_by_slug("music").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);
        assert!(repo.exists_by_slug("music").await.unwrap());
        assert!(!repo.exists_by_slug("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_ordered_by_title() {
        let repo = setup().await;

        repo.create(&Subject::new("Zoology".to_string(), "zoology".to_string()))
            .await
            .unwrap();
        repo.create(&Subject::new("Algebra".to_string(), "algebra".to_string()))
            .await
            .unwrap();

        let subjects = repo.list().await.unwrap();
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].title, "Algebra");
        assert_eq!(subjects[1].title, "Zoology");
    }

    #[tokio::test]
    async fn test_list_with_course_counts_empty() {
        let repo = setup().await;

        repo.create(&Subject::new("Math".to_string(), "math".to_string()))
            .await
            .unwrap();

        let counted = repo.list_with_course_counts().await.unwrap();
        assert_eq!(counted.len(), 1);
        assert_eq!(counted[0].total_courses, 0);
    }
}
